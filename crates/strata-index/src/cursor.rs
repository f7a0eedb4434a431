//! Merged cursors and iterators over both stages of a [`CompactIndex`].
//!
//! A cursor holds one position per stage: the first dynamic entry at or
//! after the current key and the first live static entry at or after it.
//! The current entry is whichever of the two has the smaller key. When both
//! stages hold the same key the dynamic entry is the one yielded and the
//! shadowed static entry is stepped over together with it.

use crate::compact::CompactIndex;
use crate::tree::{LeafPos, StaticPos};
use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use strata_common::FixedWidthKey;

/// Detached cursor position.
///
/// Returned by [`CompactIndex::insert`] and accepted by
/// [`CompactIndex::erase_at`]. A position is only meaningful until the index
/// is next mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub(crate) dynamic: LeafPos,
    pub(crate) static_pos: StaticPos,
}

/// Bidirectional cursor over the live entries of a [`CompactIndex`].
pub struct Cursor<'a, K, V> {
    index: &'a CompactIndex<K, V>,
    pos: Position,
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

impl<K, V> PartialEq for Cursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.index, other.index) && self.pos == other.pos
    }
}

impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K: FixedWidthKey + fmt::Debug, V: fmt::Debug> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("entry", &self.entry())
            .field("pos", &self.pos)
            .finish()
    }
}

impl<'a, K: FixedWidthKey, V> Cursor<'a, K, V> {
    #[inline]
    pub(crate) fn new(index: &'a CompactIndex<K, V>, pos: Position) -> Self {
        Self { index, pos }
    }

    /// Current entry, or `None` at the end.
    pub fn entry(&self) -> Option<(&'a K, &'a V)> {
        let index = self.index;
        let dynamic = index.dynamic_stage().entry_at(self.pos.dynamic);
        let live = index.static_stage().entry_at(self.pos.static_pos);
        match (dynamic, live) {
            (Some(d), Some(s)) if s.0 < d.0 => Some(s),
            (Some(d), _) => Some(d),
            (None, s) => s,
        }
    }

    /// Current key, or `None` at the end.
    #[inline]
    pub fn key(&self) -> Option<&'a K> {
        self.entry().map(|(k, _)| k)
    }

    /// Current value, or `None` at the end.
    #[inline]
    pub fn value(&self) -> Option<&'a V> {
        self.entry().map(|(_, v)| v)
    }

    /// Returns true if the cursor is past the last entry.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.entry().is_none()
    }

    /// Detached position of this cursor.
    #[inline]
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Steps to the next entry. A no-op at the end.
    pub fn move_next(&mut self) {
        let index = self.index;
        let (dynamic, live) = (index.dynamic_stage(), index.static_stage());
        let ord = match (
            dynamic.key_at(self.pos.dynamic),
            live.entry_at(self.pos.static_pos),
        ) {
            (Some(dk), Some((sk, _))) => dk.cmp(sk),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => return,
        };
        if ord != Ordering::Greater {
            self.pos.dynamic = dynamic.next(self.pos.dynamic);
        }
        if ord != Ordering::Less {
            self.pos.static_pos = live.next(self.pos.static_pos);
        }
    }

    /// Steps to the previous entry. A no-op at the first entry.
    pub fn move_prev(&mut self) {
        let index = self.index;
        let (dynamic, live) = (index.dynamic_stage(), index.static_stage());
        let dynamic_prev =
            (self.pos.dynamic != dynamic.begin()).then(|| dynamic.prev(self.pos.dynamic));
        let static_prev = live.prev_live(self.pos.static_pos);

        let ord = match (
            dynamic_prev.and_then(|p| dynamic.key_at(p)),
            static_prev.and_then(|p| live.key_at(p)),
        ) {
            (Some(dk), Some(sk)) => dk.cmp(sk),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => return,
        };
        if ord != Ordering::Less {
            if let Some(p) = dynamic_prev {
                self.pos.dynamic = p;
            }
        }
        if ord != Ordering::Greater {
            if let Some(p) = static_prev {
                self.pos.static_pos = p;
            }
        }
    }
}

/// Double-ended iterator over a span of a [`CompactIndex`] in key order.
///
/// Created by [`CompactIndex::iter`] and [`CompactIndex::range`].
pub struct Iter<'a, K, V> {
    front: Cursor<'a, K, V>,
    /// One past the last entry still to be yielded from the back.
    back: Cursor<'a, K, V>,
}

impl<'a, K, V> Iter<'a, K, V> {
    #[inline]
    pub(crate) fn new(front: Cursor<'a, K, V>, back: Cursor<'a, K, V>) -> Self {
        Self { front, back }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
        }
    }
}

impl<'a, K: FixedWidthKey, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let entry = self.front.entry()?;
        self.front.move_next();
        Some(entry)
    }
}

impl<K: FixedWidthKey, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back.move_prev();
        self.back.entry()
    }
}

impl<K: FixedWidthKey, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over the keys of a [`CompactIndex`].
pub struct Keys<'a, K, V>(pub(crate) Iter<'a, K, V>);

impl<'a, K: FixedWidthKey, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.0.next().map(|(k, _)| k)
    }
}

impl<K: FixedWidthKey, V> DoubleEndedIterator for Keys<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _)| k)
    }
}

/// Iterator over the values of a [`CompactIndex`], in key order.
pub struct Values<'a, K, V>(pub(crate) Iter<'a, K, V>);

impl<'a, K: FixedWidthKey, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.0.next().map(|(_, v)| v)
    }
}

impl<K: FixedWidthKey, V> DoubleEndedIterator for Values<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use crate::CompactIndex;
    use strata_common::IndexConfig;

    /// Index with keys split across both stages: evens compacted, odds dynamic.
    fn split_index() -> CompactIndex<u32, u32> {
        let config = IndexConfig::default().with_orders(4, 4);
        let mut index = CompactIndex::with_config(config).unwrap();
        for key in (0..20).step_by(2) {
            index.upsert(key, key);
        }
        index.compact_now();
        for key in (1..20).step_by(2) {
            index.upsert(key, key);
        }
        index
    }

    #[test]
    fn test_forward_walk_interleaves_stages() {
        let index = split_index();
        assert_eq!(index.static_len(), 10);
        assert_eq!(index.dynamic_len(), 10);

        let mut cursor = index.begin();
        let mut seen = Vec::new();
        while let Some(key) = cursor.key() {
            seen.push(*key);
            cursor.move_next();
        }
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
        assert!(cursor.is_end());
        assert_eq!(cursor, index.end());
    }

    #[test]
    fn test_backward_walk_interleaves_stages() {
        let index = split_index();
        let mut cursor = index.end();
        let mut seen = Vec::new();
        while cursor != index.begin() {
            cursor.move_prev();
            seen.push(*cursor.key().unwrap());
        }
        assert_eq!(seen, (0..20).rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_boundary_moves_are_noops() {
        let index = split_index();
        let mut cursor = index.begin();
        cursor.move_prev();
        assert_eq!(cursor, index.begin());

        let mut cursor = index.end();
        cursor.move_next();
        assert_eq!(cursor, index.end());

        let empty: CompactIndex<u32, u32> = CompactIndex::new();
        let mut cursor = empty.begin();
        cursor.move_prev();
        cursor.move_next();
        assert!(cursor.is_end());
        assert_eq!(cursor, empty.end());
    }

    #[test]
    fn test_shadowed_key_yielded_once() {
        let mut index = split_index();
        // Shadow static key 4 with a dynamic copy.
        index.upsert(4, 400);
        let entries: Vec<_> = index.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(entries.len(), 20);
        assert_eq!(entries[4], (4, 400));

        let mut cursor = index.find(&4);
        assert_eq!(cursor.value(), Some(&400));
        cursor.move_next();
        assert_eq!(cursor.key(), Some(&5));
        cursor.move_prev();
        assert_eq!(cursor.entry(), Some((&4, &400)));
        cursor.move_prev();
        assert_eq!(cursor.key(), Some(&3));
    }

    #[test]
    fn test_iter_meets_in_the_middle() {
        let index = split_index();
        let mut iter = index.iter();
        let mut front = Vec::new();
        let mut back = Vec::new();
        loop {
            match iter.next() {
                Some((k, _)) => front.push(*k),
                None => break,
            }
            match iter.next_back() {
                Some((k, _)) => back.push(*k),
                None => break,
            }
        }
        assert_eq!(front, (0..10).collect::<Vec<_>>());
        assert_eq!(back, (10..20).rev().collect::<Vec<_>>());
        assert!(iter.next().is_none());
        assert!(iter.next_back().is_none());
    }

    #[test]
    fn test_keys_and_values() {
        let index = split_index();
        assert_eq!(index.keys().rev().next(), Some(&19));
        assert_eq!(index.values().copied().sum::<u32>(), (0..20).sum());
    }
}
