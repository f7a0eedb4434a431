//! Two-stage compacting ordered map.
//!
//! ```text
//! insert/upsert ──> bloom.insert ──> DynamicIndex ──┐
//!                                                   │ compact_now()
//! get ──> bloom says maybe? ──> DynamicIndex        v
//!              │ no / miss                    StaticIndex (rebuilt)
//!              └────────────────────────────> StaticIndex
//! ```
//!
//! A key may be live in both stages at once. The dynamic copy shadows the
//! static one for reads and iteration, both copies are cleared by erase, and
//! the next compaction drops the static copy. `shadowed` counts such keys so
//! `len()` stays exact without touching the static stage on every upsert.

use crate::bloom::BloomFilter;
use crate::cursor::{Cursor, Iter, Keys, Position, Values};
use crate::tree::{merge, CompactionStats, DynamicIndex, StaticIndex};
use std::fmt;
use std::ops::{Bound, Index, RangeBounds};
use std::time::Instant;
use strata_common::{FixedWidthKey, IndexConfig, Result, StrataError};
use tracing::{debug, trace};

/// Ordered map combining a write-optimized B+Tree with a read-optimized
/// compact tree.
///
/// Writes land in the dynamic stage. Once the dynamic stage reaches
/// `compaction.threshold` entries and is at least `1 / compaction.ratio` the
/// size of the static stage, the next write first merges it into a freshly
/// built static stage.
///
/// The index is not internally synchronized. Mutation requires `&mut self`,
/// so cursors and iterators can never observe a compaction in progress.
pub struct CompactIndex<K, V> {
    dynamic: DynamicIndex<K, V>,
    static_index: StaticIndex<K, V>,
    /// Summarizes the keys written to `dynamic` since the last compaction.
    bloom: BloomFilter,
    config: IndexConfig,
    inner_order: usize,
    leaf_order: usize,
    /// Keys live in both stages.
    shadowed: usize,
    stats: CompactionStats,
}

impl<K: FixedWidthKey, V> CompactIndex<K, V> {
    /// Creates an empty index with the default configuration.
    pub fn new() -> Self {
        Self::build(IndexConfig::default())
    }

    /// Creates an empty index, rejecting an invalid configuration.
    pub fn with_config(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: IndexConfig) -> Self {
        let inner_order = config.inner_order_for::<K>();
        let leaf_order = config.leaf_order_for::<K, V>();
        let mut bloom = BloomFilter::new(config.bloom.num_probes, config.bloom.bits_per_key);
        bloom.reallocate(config.compaction.threshold);
        Self {
            dynamic: DynamicIndex::new(inner_order, leaf_order),
            static_index: StaticIndex::new(inner_order, leaf_order),
            bloom,
            config,
            inner_order,
            leaf_order,
            shadowed: 0,
            stats: CompactionStats::default(),
        }
    }

    #[inline]
    pub(crate) fn dynamic_stage(&self) -> &DynamicIndex<K, V> {
        &self.dynamic
    }

    #[inline]
    pub(crate) fn static_stage(&self) -> &StaticIndex<K, V> {
        &self.static_index
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.dynamic.len() + self.static_index.len() - self.shadowed
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configuration this index was built with.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Returns cumulative compaction statistics.
    pub fn stats(&self) -> &CompactionStats {
        &self.stats
    }

    /// Resets compaction statistics.
    pub fn reset_stats(&mut self) {
        self.stats = CompactionStats::default();
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Returns false when `key` is certainly absent from the dynamic stage.
    #[inline]
    fn may_be_dynamic(&self, key: &K) -> bool {
        if self.dynamic.is_empty() {
            return false;
        }
        if !self.config.bloom.enabled {
            return true;
        }
        let maybe = self.bloom.may_contain(key.key_bytes().as_ref());
        if !maybe {
            trace!("bloom filter excluded dynamic stage");
        }
        maybe
    }

    #[inline]
    fn bloom_insert(&mut self, key: &K) {
        if self.config.bloom.enabled {
            self.bloom.insert(key.key_bytes().as_ref());
        }
    }

    /// Returns the value of `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        if self.may_be_dynamic(key) {
            if let Some(value) = self.dynamic.get(key) {
                return Some(value);
            }
        }
        self.static_index.get(key)
    }

    /// Returns true if `key` is live.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Number of live entries for `key` (0 or 1).
    #[inline]
    pub fn count(&self, key: &K) -> usize {
        usize::from(self.contains_key(key))
    }

    // =========================================================================
    // Cursors
    // =========================================================================

    /// Cursor at `key`, or the end cursor if `key` is not live.
    pub fn find(&self, key: &K) -> Cursor<'_, K, V> {
        let cursor = self.lower_bound(key);
        if cursor.key() == Some(key) {
            cursor
        } else {
            self.end()
        }
    }

    /// Cursor at the first entry whose key is `>= key`.
    pub fn lower_bound(&self, key: &K) -> Cursor<'_, K, V> {
        Cursor::new(
            self,
            Position {
                dynamic: self.dynamic.lower_bound(key),
                static_pos: self.static_index.lower_bound(key),
            },
        )
    }

    /// Cursor at the first entry whose key is `> key`.
    pub fn upper_bound(&self, key: &K) -> Cursor<'_, K, V> {
        Cursor::new(
            self,
            Position {
                dynamic: self.dynamic.upper_bound(key),
                static_pos: self.static_index.upper_bound(key),
            },
        )
    }

    /// Cursor at the smallest entry.
    pub fn begin(&self) -> Cursor<'_, K, V> {
        Cursor::new(
            self,
            Position {
                dynamic: self.dynamic.begin(),
                static_pos: self.static_index.begin(),
            },
        )
    }

    /// Cursor past the largest entry.
    pub fn end(&self) -> Cursor<'_, K, V> {
        Cursor::new(
            self,
            Position {
                dynamic: self.dynamic.end(),
                static_pos: self.static_index.end(),
            },
        )
    }

    /// Re-attaches a position returned by an earlier call.
    pub fn cursor(&self, position: Position) -> Cursor<'_, K, V> {
        Cursor::new(self, position)
    }

    /// Iterates live entries in key order. Use `.rev()` for descending order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.begin(), self.end())
    }

    /// Iterates the live entries whose keys fall in `range`.
    ///
    /// An inverted range yields nothing.
    pub fn range<R: RangeBounds<K>>(&self, range: R) -> Iter<'_, K, V> {
        let front = match range.start_bound() {
            Bound::Included(key) => self.lower_bound(key),
            Bound::Excluded(key) => self.upper_bound(key),
            Bound::Unbounded => self.begin(),
        };
        let back = match range.end_bound() {
            Bound::Included(key) => self.upper_bound(key),
            Bound::Excluded(key) => self.lower_bound(key),
            Bound::Unbounded => self.end(),
        };
        let inverted = match (range.start_bound(), range.end_bound()) {
            (Bound::Excluded(s), Bound::Excluded(e)) => s >= e,
            (Bound::Included(s) | Bound::Excluded(s), Bound::Included(e) | Bound::Excluded(e)) => {
                s > e
            }
            _ => false,
        };
        if inverted {
            Iter::new(front, front)
        } else {
            Iter::new(front, back)
        }
    }

    /// Iterates keys in order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Iterates values in key order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    fn maybe_compact(&mut self) {
        if self
            .config
            .compaction
            .should_compact(self.dynamic.len(), self.static_index.len())
        {
            self.compact_now();
        }
    }

    /// Inserts `key` unless it is already live in either stage.
    ///
    /// Returns the position of `key` and whether the value was inserted.
    pub fn insert(&mut self, key: K, value: V) -> (Position, bool) {
        self.maybe_compact();
        if self.contains_key(&key) {
            return (self.lower_bound(&key).position(), false);
        }
        let (dynamic, _) = self.dynamic.insert(key, value);
        self.bloom_insert(&key);
        let static_pos = self.static_index.lower_bound(&key);
        (
            Position {
                dynamic,
                static_pos,
            },
            true,
        )
    }

    /// Inserts or overwrites `key`. Returns true if `key` was not live before.
    pub fn upsert(&mut self, key: K, value: V) -> bool {
        self.maybe_compact();
        if self.dynamic.upsert(key, value).is_some() {
            return false;
        }
        self.bloom_insert(&key);
        if self.static_index.contains_key(&key) {
            self.shadowed += 1;
            return false;
        }
        true
    }

    /// Returns a mutable reference to the value of `key`, inserting
    /// `default()` first if `key` is not live.
    ///
    /// A key live only in the static stage is moved to the dynamic stage.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, default: F) -> &mut V {
        self.maybe_compact();
        let in_dynamic = self.may_be_dynamic(&key) && self.dynamic.contains_key(&key);
        if !in_dynamic {
            self.bloom_insert(&key);
            if let Some(value) = self.static_index.lazy_remove(&key) {
                return self.dynamic.get_or_insert_with(key, || value);
            }
        }
        self.dynamic.get_or_insert_with(key, default)
    }

    /// Like [`get_or_insert_with`](Self::get_or_insert_with) with `V::default()`.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Removes `key`. Returns its value if it was live.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        if self.may_be_dynamic(key) {
            if let Some(value) = self.dynamic.remove(key) {
                if self.static_index.lazy_erase(key) {
                    self.shadowed -= 1;
                }
                return Some(value);
            }
        }
        self.static_index.lazy_remove(key)
    }

    /// Removes `key`. Returns true if it was live.
    #[inline]
    pub fn erase(&mut self, key: &K) -> bool {
        self.remove(key).is_some()
    }

    /// Removes the entry at `position`. Returns false at the end position.
    pub fn erase_at(&mut self, position: Position) -> bool {
        match self.cursor(position).key().copied() {
            Some(key) => self.erase(&key),
            None => false,
        }
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        let dropped = self.len();
        self.dynamic.clear();
        self.static_index = StaticIndex::new(self.inner_order, self.leaf_order);
        self.bloom.reallocate(self.config.compaction.threshold);
        self.shadowed = 0;
        debug!(dropped, "compact index cleared");
    }

    /// Merges the dynamic stage into a rebuilt static stage.
    pub fn compact_now(&mut self) {
        let start = Instant::now();
        let old_static = std::mem::replace(
            &mut self.static_index,
            StaticIndex::new(self.inner_order, self.leaf_order),
        );
        let (merged, report) =
            merge::compact(&mut self.dynamic, old_static, self.inner_order, self.leaf_order);
        self.static_index = merged;
        self.shadowed = 0;

        let compaction = &self.config.compaction;
        let expected = (self.static_index.len() / compaction.ratio).max(compaction.threshold);
        self.bloom.reallocate(expected);

        let elapsed = start.elapsed();
        self.stats.record(&report, elapsed.as_nanos() as u64);
        debug!(
            from_dynamic = report.from_dynamic,
            from_static = report.from_static,
            written = report.written,
            dropped_tombstones = report.dropped_tombstones,
            dropped_shadowed = report.dropped_shadowed,
            leaves = self.static_index.leaf_count(),
            inner_nodes = self.static_index.inner_count(),
            bloom_bytes = self.bloom.size_bytes(),
            elapsed_us = elapsed.as_micros() as u64,
            "compacted dynamic stage"
        );
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Entries held by the dynamic stage.
    pub fn dynamic_len(&self) -> usize {
        self.dynamic.len()
    }

    /// Live entries held by the static stage.
    pub fn static_len(&self) -> usize {
        self.static_index.len()
    }

    pub fn dynamic_height(&self) -> usize {
        self.dynamic.height()
    }

    pub fn static_height(&self) -> usize {
        self.static_index.height()
    }

    pub fn dynamic_inner_count(&self) -> usize {
        self.dynamic.inner_count()
    }

    pub fn dynamic_leaf_count(&self) -> usize {
        self.dynamic.leaf_count()
    }

    pub fn static_inner_count(&self) -> usize {
        self.static_index.inner_count()
    }

    pub fn static_leaf_count(&self) -> usize {
        self.static_index.leaf_count()
    }

    /// Tombstoned static slots awaiting the next compaction.
    pub fn static_tombstones(&self) -> usize {
        self.static_index.tombstones()
    }

    /// Size of the bloom filter's bit array.
    pub fn bloom_size_bytes(&self) -> usize {
        self.bloom.size_bytes()
    }

    /// Verifies both stages, the shadow count and bloom coverage of the
    /// dynamic stage.
    pub fn check_invariants(&self) -> Result<()> {
        self.dynamic.check_invariants()?;
        self.static_index.check_invariants()?;

        let mut shadowed = 0;
        for (key, _) in self.dynamic.iter() {
            if self.config.bloom.enabled && !self.bloom.may_contain(key.key_bytes().as_ref()) {
                return Err(StrataError::corrupted(
                    "dynamic key missing from bloom filter",
                ));
            }
            if self.static_index.contains_key(key) {
                shadowed += 1;
            }
        }
        if shadowed != self.shadowed {
            return Err(StrataError::corrupted(format!(
                "{} shadowed keys tracked, {} found",
                self.shadowed, shadowed
            )));
        }
        Ok(())
    }
}

impl<K: FixedWidthKey, V> Default for CompactIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: FixedWidthKey, V> Index<&K> for CompactIndex<K, V> {
    type Output = V;

    /// Panics if `key` is not live.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found in CompactIndex"),
        }
    }
}

impl<'a, K: FixedWidthKey, V> IntoIterator for &'a CompactIndex<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K: FixedWidthKey, V> Extend<(K, V)> for CompactIndex<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.upsert(key, value);
        }
    }
}

impl<K: FixedWidthKey, V> FromIterator<(K, V)> for CompactIndex<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl<K: FixedWidthKey, V: PartialEq> PartialEq for CompactIndex<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: FixedWidthKey, V: Eq> Eq for CompactIndex<K, V> {}

impl<K: FixedWidthKey + fmt::Debug, V: fmt::Debug> fmt::Debug for CompactIndex<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
