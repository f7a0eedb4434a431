//! Fixed-width key encoding.

/// A totally ordered key with a fixed-width binary representation.
///
/// The bloom filter hashes `key_bytes()`, so every value of a key type must
/// encode to the same number of bytes. Integers use little-endian encoding.
pub trait FixedWidthKey: Ord + Copy {
    /// Encoded form, always `WIDTH` bytes long.
    type Bytes: AsRef<[u8]>;

    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Returns the fixed-width encoding of this key.
    fn key_bytes(&self) -> Self::Bytes;
}

macro_rules! impl_fixed_width_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl FixedWidthKey for $t {
                type Bytes = [u8; std::mem::size_of::<$t>()];

                const WIDTH: usize = std::mem::size_of::<$t>();

                #[inline(always)]
                fn key_bytes(&self) -> Self::Bytes {
                    self.to_le_bytes()
                }
            }
        )*
    };
}

impl_fixed_width_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl<const N: usize> FixedWidthKey for [u8; N] {
    type Bytes = [u8; N];

    const WIDTH: usize = N;

    #[inline(always)]
    fn key_bytes(&self) -> Self::Bytes {
        *self
    }
}
