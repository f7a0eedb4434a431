//! Compacting ordered index for Strata.
//!
//! This crate provides:
//! - `CompactIndex`, an ordered map split into a write-optimized dynamic
//!   stage and a read-optimized static stage
//! - `DynamicIndex`, an arena-allocated B+Tree with top-down split and merge
//! - `StaticIndex`, a packed tree rebuilt by compaction with lazy deletion
//! - `BloomFilter` gating lookups into the dynamic stage
//! - Merged bidirectional cursors spanning both stages
//!
//! ```
//! use strata_index::CompactIndex;
//!
//! let mut index = CompactIndex::new();
//! for key in (0..20u64).step_by(2) {
//!     index.upsert(key, key * 10);
//! }
//! index.compact_now();
//! assert_eq!(index.dynamic_len(), 0);
//!
//! index.erase(&4);
//! index.upsert(4, 99);
//! assert_eq!(index.get(&4), Some(&99));
//! assert_eq!(index.keys().count(), 10);
//! ```

mod bloom;
mod compact;
mod cursor;
pub mod tree;

pub use bloom::BloomFilter;
pub use compact::CompactIndex;
pub use cursor::{Cursor, Iter, Keys, Position, Values};
pub use strata_common::{FixedWidthKey, IndexConfig, Result, StrataError};
pub use tree::{CompactionStats, DynamicIndex, MergeReport, StaticBuilder, StaticIndex};
