//! Bloom filter summarizing the dynamic stage's key set.

/// Seed mixed into every key hash.
const BLOOM_SEED: u32 = 0xbc9f_1d34;

/// Multiplier of the murmur-style mixing step.
const HASH_MUL: u32 = 0xc6a4_a793;

/// Approximate set membership over fixed-width byte keys.
///
/// `may_contain` never returns false for an inserted key. Each key sets
/// `num_probes` bits at `h, h + delta, h + 2 * delta, ...` where `delta` is
/// derived from the same hash, so a single hash computation serves all probes.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits_per_key: usize,
    num_probes: usize,
    /// Bit array, never empty.
    array: Box<[u8]>,
}

impl BloomFilter {
    /// Creates a filter with a one-byte array. Call [`reallocate`](Self::reallocate)
    /// to size it for an expected key count.
    pub fn new(num_probes: usize, bits_per_key: usize) -> Self {
        debug_assert!(num_probes > 0 && bits_per_key > 0);
        Self {
            bits_per_key,
            num_probes,
            array: vec![0u8; 1].into_boxed_slice(),
        }
    }

    /// Drops every key and resizes the array to `bits_per_key * expected_count`
    /// bits, rounded up to a whole byte.
    pub fn reallocate(&mut self, expected_count: usize) {
        let bytes = (expected_count.saturating_mul(self.bits_per_key) + 7) / 8;
        self.array = vec![0u8; bytes.max(1)].into_boxed_slice();
    }

    /// Size of the bit array in bytes.
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.array.len()
    }

    #[inline(always)]
    fn num_bits(&self) -> u32 {
        // Bit positions are 32-bit, matching the hash width.
        (self.array.len() * 8).min(u32::MAX as usize) as u32
    }

    /// Registers a key.
    pub fn insert(&mut self, key: &[u8]) {
        let bits = self.num_bits();
        let mut h = bloom_hash(key);
        let delta = h.rotate_right(17);
        for _ in 0..self.num_probes {
            let bitpos = h % bits;
            self.array[(bitpos / 8) as usize] |= 1 << (bitpos % 8);
            h = h.wrapping_add(delta);
        }
    }

    /// Returns false only if `key` was never inserted since the last reallocation.
    pub fn may_contain(&self, key: &[u8]) -> bool {
        let bits = self.num_bits();
        let mut h = bloom_hash(key);
        let delta = h.rotate_right(17);
        for _ in 0..self.num_probes {
            let bitpos = h % bits;
            if self.array[(bitpos / 8) as usize] & (1 << (bitpos % 8)) == 0 {
                return false;
            }
            h = h.wrapping_add(delta);
        }
        true
    }
}

#[inline(always)]
fn bloom_hash(data: &[u8]) -> u32 {
    hash(data, BLOOM_SEED)
}

/// Murmur-like 32-bit hash over little-endian 4-byte words.
fn hash(data: &[u8], seed: u32) -> u32 {
    let mut h = seed ^ (data.len() as u32).wrapping_mul(HASH_MUL);

    let mut words = data.chunks_exact(4);
    for word in &mut words {
        let w = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        h = h.wrapping_add(w);
        h = h.wrapping_mul(HASH_MUL);
        h ^= h >> 16;
    }

    let tail = words.remainder();
    if !tail.is_empty() {
        for (i, &b) in tail.iter().enumerate().rev() {
            h = h.wrapping_add((b as u32) << (8 * i));
        }
        h = h.wrapping_mul(HASH_MUL);
        h ^= h >> 24;
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_false_negatives() {
        let mut filter = BloomFilter::new(2, 8);
        filter.reallocate(1000);
        for i in 0..1000u64 {
            filter.insert(&i.to_le_bytes());
        }
        for i in 0..1000u64 {
            assert!(filter.may_contain(&i.to_le_bytes()), "false negative for {}", i);
        }
    }

    #[test]
    fn test_false_positive_rate_is_bounded() {
        let mut filter = BloomFilter::new(2, 8);
        filter.reallocate(1000);
        for i in 0..1000u64 {
            filter.insert(&i.to_le_bytes());
        }
        let false_positives = (1_000_000..1_010_000u64)
            .filter(|i| filter.may_contain(&i.to_le_bytes()))
            .count();
        // Two probes at 8 bits per key land around 5%.
        assert!(false_positives < 1500, "{} false positives", false_positives);
    }

    #[test]
    fn test_reallocate_sizes_and_clears() {
        let mut filter = BloomFilter::new(2, 8);
        filter.reallocate(100);
        assert_eq!(filter.size_bytes(), 100);

        filter.insert(b"key1");
        assert!(filter.may_contain(b"key1"));

        filter.reallocate(10);
        assert_eq!(filter.size_bytes(), 10);
        assert!(!filter.may_contain(b"key1"));
    }

    #[test]
    fn test_reallocate_rounds_up_to_byte() {
        let mut filter = BloomFilter::new(2, 3);
        filter.reallocate(3);
        // 9 bits round up to 2 bytes.
        assert_eq!(filter.size_bytes(), 2);
    }

    #[test]
    fn test_zero_expected_keys_keeps_one_byte() {
        let mut filter = BloomFilter::new(2, 8);
        filter.reallocate(0);
        assert_eq!(filter.size_bytes(), 1);
        filter.insert(&42u32.to_le_bytes());
        assert!(filter.may_contain(&42u32.to_le_bytes()));
    }

    #[test]
    fn test_empty_filter_rejects() {
        let mut filter = BloomFilter::new(2, 8);
        filter.reallocate(64);
        assert!(!filter.may_contain(&7u64.to_le_bytes()));
    }

    #[test]
    fn test_hash_tail_bytes() {
        // Keys that differ only in tail bytes hash differently.
        assert_ne!(hash(b"abcde", 0), hash(b"abcdf", 0));
        assert_ne!(hash(&[1, 2, 3], 0), hash(&[1, 2, 4], 0));
        assert_eq!(hash(b"", 7), 7);
    }
}
