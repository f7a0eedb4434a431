//! Tree structures behind the compacting index.
//!
//! ```text
//! writes ──> DynamicIndex (B+Tree, split/merge in place)
//!                 │
//!                 │ merge::compact (when dynamic_len * ratio >= static_len)
//!                 v
//!            StaticIndex (packed leaves, tombstones only)
//! ```
//!
//! Both trees keep keys as upper-bound separators in inner nodes and link
//! their leaves in key order. The end of each tree is a virtual slot after
//! the last entry of its last leaf.

pub mod arena;
pub mod dynamic;
pub mod merge;
pub mod static_tree;
pub mod types;

pub use arena::{NodeArena, NodeId};
pub use dynamic::{DynamicIndex, LeafPos};
pub use static_tree::{StaticBuilder, StaticIndex, StaticPos};
pub use types::{CompactionStats, MergeReport};
