//! Immutable compact B+Tree (the static stage).
//!
//! Leaves are stored contiguously and addressed by position, so a cursor is
//! just `(leaf, slot)`. Inner levels are built bottom-up from runs of
//! consecutive children, which lets an inner node record only the position
//! of its first child.
//!
//! The only in-place mutation is tombstoning: a value slot is set to `None`
//! and the entry stays physically present until the next rebuild. Every
//! navigation step skips tombstoned slots.

use strata_common::{Result, StrataError};

/// Leaf with sorted keys and optional values. `None` marks a tombstone.
pub(crate) struct StaticLeaf<K, V> {
    keys: Vec<K>,
    values: Vec<Option<V>>,
}

/// Inner node over `keys.len() + 1` consecutive children of the level below.
struct StaticInner<K> {
    first_child: usize,
    /// `keys[i]` is the largest key below child `i`.
    keys: Vec<K>,
}

/// Slot position inside the static leaf array.
///
/// Only the last leaf may be addressed at `slot == len`; that position is
/// the end of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticPos {
    pub(crate) leaf: usize,
    pub(crate) slot: usize,
}

/// Read-optimized tree rebuilt wholesale by compaction.
pub struct StaticIndex<K, V> {
    leaves: Vec<StaticLeaf<K, V>>,
    /// `levels[0]` sits directly above the leaves; the last level is the root.
    levels: Vec<Vec<StaticInner<K>>>,
    /// Live (non-tombstoned) entries.
    len: usize,
    tombstones: usize,
    inner_order: usize,
    leaf_order: usize,
}

impl<K: Ord + Copy, V> StaticIndex<K, V> {
    /// Creates an empty tree holding a single empty leaf.
    pub fn new(inner_order: usize, leaf_order: usize) -> Self {
        StaticBuilder::new(inner_order, leaf_order).finish()
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of tombstoned slots awaiting the next rebuild.
    #[inline]
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Tree height (1 = just a root leaf).
    #[inline]
    pub fn height(&self) -> usize {
        self.levels.len() + 1
    }

    #[inline]
    pub fn inner_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    fn find_leaf(&self, key: &K, upper: bool) -> usize {
        let mut idx = 0;
        for level in self.levels.iter().rev() {
            let node = &level[idx];
            let child = if upper {
                node.keys.iter().take_while(|sep| *sep <= key).count()
            } else {
                node.keys.iter().take_while(|sep| *sep < key).count()
            };
            idx = node.first_child + child;
        }
        idx
    }

    #[inline]
    fn normalize(&self, leaf: usize, slot: usize) -> StaticPos {
        if slot >= self.leaves[leaf].keys.len() && leaf + 1 < self.leaves.len() {
            StaticPos {
                leaf: leaf + 1,
                slot: 0,
            }
        } else {
            StaticPos { leaf, slot }
        }
    }

    #[inline]
    fn is_live(&self, pos: StaticPos) -> bool {
        matches!(
            self.leaves.get(pos.leaf).and_then(|l| l.values.get(pos.slot)),
            Some(Some(_))
        )
    }

    /// First live position at or after `pos`, or the end.
    fn skip_forward(&self, mut pos: StaticPos) -> StaticPos {
        let end = self.end();
        while pos != end && !self.is_live(pos) {
            pos = self.normalize(pos.leaf, pos.slot + 1);
        }
        pos
    }

    /// Raw slot (live or not) holding `key`.
    fn locate(&self, key: &K) -> Option<StaticPos> {
        let leaf = self.find_leaf(key, false);
        let keys = &self.leaves[leaf].keys;
        let slot = keys.iter().take_while(|k| *k < key).count();
        (slot < keys.len() && keys[slot] == *key).then_some(StaticPos { leaf, slot })
    }

    /// Position of `key` if it is live.
    pub fn find(&self, key: &K) -> Option<StaticPos> {
        self.locate(key).filter(|pos| self.is_live(*pos))
    }

    /// Value of `key` if it is live.
    pub fn get(&self, key: &K) -> Option<&V> {
        let pos = self.locate(key)?;
        self.leaves[pos.leaf].values[pos.slot].as_ref()
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// First live position whose key is `>= key`.
    pub fn lower_bound(&self, key: &K) -> StaticPos {
        let leaf = self.find_leaf(key, false);
        let slot = self.leaves[leaf].keys.iter().take_while(|k| *k < key).count();
        self.skip_forward(self.normalize(leaf, slot))
    }

    /// First live position whose key is `> key`.
    pub fn upper_bound(&self, key: &K) -> StaticPos {
        let leaf = self.find_leaf(key, true);
        let slot = self.leaves[leaf].keys.iter().take_while(|k| *k <= key).count();
        self.skip_forward(self.normalize(leaf, slot))
    }

    /// First live position (equals `end()` when no entry is live).
    #[inline]
    pub fn begin(&self) -> StaticPos {
        self.skip_forward(StaticPos { leaf: 0, slot: 0 })
    }

    /// The end position: one past the last slot of the last leaf.
    #[inline]
    pub fn end(&self) -> StaticPos {
        let leaf = self.leaves.len() - 1;
        StaticPos {
            leaf,
            slot: self.leaves[leaf].keys.len(),
        }
    }

    /// Next live position after `pos`. `next(end()) == end()`.
    pub fn next(&self, pos: StaticPos) -> StaticPos {
        if pos == self.end() {
            return pos;
        }
        self.skip_forward(self.normalize(pos.leaf, pos.slot + 1))
    }

    /// Nearest live position before `pos`, if any.
    pub fn prev_live(&self, mut pos: StaticPos) -> Option<StaticPos> {
        loop {
            pos = if pos.slot > 0 {
                StaticPos {
                    leaf: pos.leaf,
                    slot: pos.slot - 1,
                }
            } else if pos.leaf > 0 {
                let leaf = pos.leaf - 1;
                StaticPos {
                    leaf,
                    slot: self.leaves[leaf].keys.len() - 1,
                }
            } else {
                return None;
            };
            if self.is_live(pos) {
                return Some(pos);
            }
        }
    }

    /// Previous live position. `prev(begin()) == begin()`.
    #[inline]
    pub fn prev(&self, pos: StaticPos) -> StaticPos {
        self.prev_live(pos).unwrap_or(pos)
    }

    /// Live entry at `pos`.
    #[inline]
    pub fn entry_at(&self, pos: StaticPos) -> Option<(&K, &V)> {
        let leaf = self.leaves.get(pos.leaf)?;
        let value = leaf.values.get(pos.slot)?.as_ref()?;
        Some((&leaf.keys[pos.slot], value))
    }

    /// Key at `pos`, live or tombstoned.
    #[inline]
    pub fn key_at(&self, pos: StaticPos) -> Option<&K> {
        self.leaves.get(pos.leaf)?.keys.get(pos.slot)
    }

    /// Iterates live entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.leaves.iter().flat_map(|leaf| {
            leaf.keys
                .iter()
                .zip(&leaf.values)
                .filter_map(|(k, v)| v.as_ref().map(|v| (k, v)))
        })
    }

    // =========================================================================
    // Lazy Deletion
    // =========================================================================

    /// Tombstones `key` in place. Returns the value if `key` was live.
    pub fn lazy_remove(&mut self, key: &K) -> Option<V> {
        let pos = self.locate(key)?;
        let value = self.leaves[pos.leaf].values[pos.slot].take()?;
        self.len -= 1;
        self.tombstones += 1;
        Some(value)
    }

    /// Tombstones `key`. Returns true if it was live.
    #[inline]
    pub fn lazy_erase(&mut self, key: &K) -> bool {
        self.lazy_remove(key).is_some()
    }

    /// Consumes the tree, yielding every slot in key order. Each leaf is
    /// released as soon as its slots have been yielded.
    pub(crate) fn into_slots(self) -> impl Iterator<Item = (K, Option<V>)> {
        let StaticIndex { leaves, levels, .. } = self;
        drop(levels);
        leaves
            .into_iter()
            .flat_map(|leaf| leaf.keys.into_iter().zip(leaf.values))
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Checks ordering, fill bounds, separator correctness and counters.
    pub fn check_invariants(&self) -> Result<()> {
        let mut live = 0;
        let mut dead = 0;
        let mut last: Option<&K> = None;
        let leaf_count = self.leaves.len();

        for (i, leaf) in self.leaves.iter().enumerate() {
            if leaf.keys.len() != leaf.values.len() {
                return Err(StrataError::corrupted("static leaf key/value count mismatch"));
            }
            if leaf.keys.len() > self.leaf_order {
                return Err(StrataError::corrupted(format!(
                    "static leaf {} holds {} entries, order is {}",
                    i,
                    leaf.keys.len(),
                    self.leaf_order
                )));
            }
            if leaf.keys.is_empty() && leaf_count > 1 {
                return Err(StrataError::corrupted(format!("static leaf {} is empty", i)));
            }
            for key in &leaf.keys {
                if last.is_some_and(|prev| prev >= key) {
                    return Err(StrataError::corrupted(
                        "static keys not strictly increasing",
                    ));
                }
                last = Some(key);
            }
            let leaf_live = leaf.values.iter().filter(|v| v.is_some()).count();
            live += leaf_live;
            dead += leaf.values.len() - leaf_live;
        }
        if live != self.len || dead != self.tombstones {
            return Err(StrataError::corrupted(format!(
                "static counters {}/{} but {} live / {} tombstoned slots",
                self.len, self.tombstones, live, dead
            )));
        }

        // Separators must equal the largest key of each child subtree.
        let mut maxes: Vec<Option<K>> =
            self.leaves.iter().map(|l| l.keys.last().copied()).collect();
        for (depth, level) in self.levels.iter().enumerate() {
            let mut expected_child = 0;
            let mut level_maxes = Vec::with_capacity(level.len());
            for node in level {
                let children = node.keys.len() + 1;
                if node.first_child != expected_child || children > self.inner_order {
                    return Err(StrataError::corrupted(format!(
                        "static inner node at level {} has bad child range",
                        depth + 1
                    )));
                }
                let below = maxes
                    .get(node.first_child..node.first_child + children)
                    .ok_or_else(|| StrataError::corrupted("static child range out of bounds"))?;
                if below[..children - 1]
                    .iter()
                    .zip(&node.keys)
                    .any(|(max, sep)| *max != Some(*sep))
                {
                    return Err(StrataError::corrupted(format!(
                        "static separator mismatch at level {}",
                        depth + 1
                    )));
                }
                level_maxes.push(below[children - 1]);
                expected_child += children;
            }
            if expected_child != maxes.len() {
                return Err(StrataError::corrupted(format!(
                    "static level {} covers {} of {} children",
                    depth + 1,
                    expected_child,
                    maxes.len()
                )));
            }
            maxes = level_maxes;
        }
        if maxes.len() != 1 {
            return Err(StrataError::corrupted("static tree has no single root"));
        }
        Ok(())
    }
}

/// Bulk loader for a [`StaticIndex`] from entries in strictly increasing
/// key order.
pub struct StaticBuilder<K, V> {
    leaves: Vec<StaticLeaf<K, V>>,
    len: usize,
    inner_order: usize,
    leaf_order: usize,
}

impl<K: Ord + Copy, V> StaticBuilder<K, V> {
    pub fn new(inner_order: usize, leaf_order: usize) -> Self {
        debug_assert!(inner_order >= 2 && leaf_order >= 1);
        Self {
            leaves: Vec::new(),
            len: 0,
            inner_order,
            leaf_order,
        }
    }

    /// Number of entries appended so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends an entry. Keys must arrive in strictly increasing order.
    pub fn push(&mut self, key: K, value: V) {
        let needs_leaf = self
            .leaves
            .last()
            .map_or(true, |leaf| leaf.keys.len() >= self.leaf_order);
        if needs_leaf {
            self.leaves.push(StaticLeaf {
                keys: Vec::with_capacity(self.leaf_order),
                values: Vec::with_capacity(self.leaf_order),
            });
        }
        let n = self.leaves.len();
        let leaf = &mut self.leaves[n - 1];
        debug_assert!(leaf.keys.last().map_or(true, |last| *last < key));
        leaf.keys.push(key);
        leaf.values.push(Some(value));
        self.len += 1;
    }

    /// Builds the inner levels bottom-up and returns the finished tree.
    pub fn finish(mut self) -> StaticIndex<K, V> {
        if self.leaves.is_empty() {
            self.leaves.push(StaticLeaf {
                keys: Vec::new(),
                values: Vec::new(),
            });
        }

        let mut levels = Vec::new();
        let mut maxes: Vec<K> = self
            .leaves
            .iter()
            .filter_map(|leaf| leaf.keys.last().copied())
            .collect();
        let mut count = self.leaves.len();
        while count > 1 {
            let mut level = Vec::with_capacity(count.div_ceil(self.inner_order));
            let mut level_maxes = Vec::with_capacity(level.capacity());
            for (i, chunk) in maxes.chunks(self.inner_order).enumerate() {
                let (last, separators) = match chunk.split_last() {
                    Some(split) => split,
                    None => break,
                };
                level.push(StaticInner {
                    first_child: i * self.inner_order,
                    keys: separators.to_vec(),
                });
                level_maxes.push(*last);
            }
            count = level.len();
            maxes = level_maxes;
            levels.push(level);
        }

        StaticIndex {
            leaves: self.leaves,
            levels,
            len: self.len,
            tombstones: 0,
            inner_order: self.inner_order,
            leaf_order: self.leaf_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(keys: impl IntoIterator<Item = u64>, inner: usize, leaf: usize) -> StaticIndex<u64, u64> {
        let mut builder = StaticBuilder::new(inner, leaf);
        for key in keys {
            builder.push(key, key * 10);
        }
        builder.finish()
    }

    fn live_keys(tree: &StaticIndex<u64, u64>) -> Vec<u64> {
        tree.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_empty_static_index() {
        let tree: StaticIndex<u64, u64> = StaticIndex::new(4, 4);
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.begin(), tree.end());
        assert_eq!(tree.lower_bound(&5), tree.end());
        assert!(tree.prev_live(tree.end()).is_none());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_build_shape() {
        // 100 entries in leaves of 4 -> 25 leaves -> 7 -> 2 -> 1.
        let tree = build(0..100, 4, 4);
        assert_eq!(tree.len(), 100);
        assert_eq!(tree.leaf_count(), 25);
        assert_eq!(tree.height(), 4);
        assert_eq!(tree.inner_count(), 7 + 2 + 1);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_find_every_key() {
        let tree = build((0..200).map(|k| k * 3), 5, 7);
        for key in 0..600u64 {
            let expected = (key % 3 == 0).then_some(key * 10);
            assert_eq!(tree.get(&key).copied(), expected, "key {}", key);
        }
    }

    #[test]
    fn test_bounds() {
        let tree = build((0..50).map(|k| k * 2), 4, 4);
        assert_eq!(tree.key_at(tree.lower_bound(&7)), Some(&8));
        assert_eq!(tree.key_at(tree.lower_bound(&8)), Some(&8));
        assert_eq!(tree.key_at(tree.upper_bound(&8)), Some(&10));
        assert_eq!(tree.lower_bound(&99), tree.end());
        assert_eq!(tree.upper_bound(&98), tree.end());
    }

    #[test]
    fn test_lazy_remove_tombstones() {
        let mut tree = build(0..20, 4, 4);
        assert_eq!(tree.lazy_remove(&5), Some(50));
        assert_eq!(tree.lazy_remove(&5), None);
        assert_eq!(tree.lazy_remove(&100), None);
        assert_eq!(tree.len(), 19);
        assert_eq!(tree.tombstones(), 1);
        assert!(!tree.contains_key(&5));
        assert!(tree.find(&5).is_none());
        // The slot is still physically there.
        assert_eq!(tree.key_at(tree.locate(&5).unwrap()), Some(&5));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_navigation_skips_tombstones() {
        let mut tree = build(0..12, 4, 4);
        // Kill a whole leaf (4..8) plus neighbors.
        for key in 3..9u64 {
            tree.lazy_erase(&key);
        }
        assert_eq!(live_keys(&tree), vec![0, 1, 2, 9, 10, 11]);
        assert_eq!(tree.key_at(tree.lower_bound(&4)), Some(&9));
        assert_eq!(tree.key_at(tree.upper_bound(&2)), Some(&9));

        let pos = tree.find(&9).unwrap();
        assert_eq!(tree.key_at(tree.prev(pos)), Some(&2));
        let pos = tree.find(&2).unwrap();
        assert_eq!(tree.key_at(tree.next(pos)), Some(&9));
    }

    #[test]
    fn test_tombstoned_edges() {
        let mut tree = build(0..10, 4, 4);
        tree.lazy_erase(&0);
        tree.lazy_erase(&9);
        assert_eq!(tree.key_at(tree.begin()), Some(&1));
        assert_eq!(tree.prev(tree.begin()), tree.begin());
        let last = tree.prev(tree.end());
        assert_eq!(tree.key_at(last), Some(&8));
        assert_eq!(tree.next(last), tree.end());
        assert_eq!(tree.next(tree.end()), tree.end());
    }

    #[test]
    fn test_all_tombstoned() {
        let mut tree = build(0..6, 4, 4);
        for key in 0..6u64 {
            tree.lazy_erase(&key);
        }
        assert!(tree.is_empty());
        assert_eq!(tree.begin(), tree.end());
        assert!(tree.prev_live(tree.end()).is_none());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_zero_value_is_not_a_tombstone() {
        let mut builder = StaticBuilder::new(4, 4);
        builder.push(1u32, 0u32);
        builder.push(2, 0);
        let tree = builder.finish();
        assert_eq!(tree.get(&1), Some(&0));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_into_slots_keeps_tombstones() {
        let mut tree = build(0..5, 4, 4);
        tree.lazy_erase(&2);
        let slots: Vec<_> = tree.into_slots().collect();
        assert_eq!(slots.len(), 5);
        assert_eq!(slots[2], (2, None));
        assert_eq!(slots[3], (3, Some(30)));
    }
}
