//! Streaming sort-merge of the dynamic stage into a new static stage.
//!
//! ```text
//! DynamicIndex leaves ──drain──┐
//!                              ├─> two-pointer merge ─> StaticBuilder ─> new StaticIndex
//! old StaticIndex leaves ──────┘       (dynamic wins ties, tombstones dropped)
//! ```
//!
//! Both inputs are consumed leaf by leaf, so the old nodes are released while
//! the new leaves are being filled rather than after the merge completes.

use super::dynamic::DynamicIndex;
use super::static_tree::{StaticBuilder, StaticIndex};
use super::types::MergeReport;

/// Merges `dynamic` and `old_static` into a new static tree.
///
/// `dynamic` is left empty. `old_static` is consumed.
pub fn compact<K: Ord + Copy, V>(
    dynamic: &mut DynamicIndex<K, V>,
    old_static: StaticIndex<K, V>,
    inner_order: usize,
    leaf_order: usize,
) -> (StaticIndex<K, V>, MergeReport) {
    let mut report = MergeReport::default();
    let mut builder = StaticBuilder::new(inner_order, leaf_order);

    let mut dynamic_iter = dynamic.drain().peekable();
    let mut static_iter = old_static.into_slots().peekable();

    loop {
        match (dynamic_iter.peek(), static_iter.peek()) {
            (_, Some((_, None))) => {
                static_iter.next();
                report.dropped_tombstones += 1;
            }
            (Some(&(dk, _)), Some(&(sk, _))) => {
                if dk > sk {
                    if let Some((key, Some(value))) = static_iter.next() {
                        builder.push(key, value);
                        report.from_static += 1;
                    }
                } else {
                    if dk == sk {
                        // Shadowed by the newer dynamic copy.
                        static_iter.next();
                        report.dropped_shadowed += 1;
                    }
                    if let Some((key, value)) = dynamic_iter.next() {
                        builder.push(key, value);
                        report.from_dynamic += 1;
                    }
                }
            }
            (Some(_), None) => {
                if let Some((key, value)) = dynamic_iter.next() {
                    builder.push(key, value);
                    report.from_dynamic += 1;
                }
            }
            (None, Some(_)) => {
                if let Some((key, Some(value))) = static_iter.next() {
                    builder.push(key, value);
                    report.from_static += 1;
                }
            }
            (None, None) => break,
        }
    }
    drop(dynamic_iter);

    report.written = builder.len();
    (builder.finish(), report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_from(keys: &[u64], values: u64) -> StaticIndex<u64, u64> {
        let mut builder = StaticBuilder::new(4, 4);
        for &k in keys {
            builder.push(k, values);
        }
        builder.finish()
    }

    #[test]
    fn test_merge_into_empty_static() {
        let mut dynamic = DynamicIndex::new(4, 4);
        for key in (0..20u64).rev() {
            dynamic.insert(key, key);
        }
        let (merged, report) = compact(&mut dynamic, StaticIndex::new(4, 4), 4, 4);

        assert!(dynamic.is_empty());
        dynamic.check_invariants().unwrap();
        merged.check_invariants().unwrap();
        assert_eq!(merged.len(), 20);
        assert_eq!(report.from_dynamic, 20);
        assert_eq!(report.written, 20);
        assert_eq!(
            merged.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(),
            (0..20).map(|k| (k, k)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_merge_interleaves_and_dynamic_wins_ties() {
        let old = static_from(&[0, 2, 4, 6, 8], 1);
        let mut dynamic = DynamicIndex::new(4, 4);
        for key in [1u64, 4, 9] {
            dynamic.insert(key, 2);
        }
        let (merged, report) = compact(&mut dynamic, old, 4, 4);

        let entries: Vec<_> = merged.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(
            entries,
            vec![(0, 1), (1, 2), (2, 1), (4, 2), (6, 1), (8, 1), (9, 2)]
        );
        assert_eq!(report.dropped_shadowed, 1);
        assert_eq!(report.from_static, 4);
        assert_eq!(report.from_dynamic, 3);
        merged.check_invariants().unwrap();
    }

    #[test]
    fn test_merge_drops_tombstones() {
        let mut old = static_from(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9], 7);
        for key in [0u64, 3, 4, 5, 9] {
            old.lazy_erase(&key);
        }
        let mut dynamic = DynamicIndex::new(4, 4);
        dynamic.insert(5, 50);

        let (merged, report) = compact(&mut dynamic, old, 4, 4);
        assert_eq!(report.dropped_tombstones, 5);
        assert_eq!(report.dropped_shadowed, 0);
        assert_eq!(merged.tombstones(), 0);
        assert_eq!(
            merged.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec![1, 2, 5, 6, 7, 8]
        );
        assert_eq!(merged.get(&5), Some(&50));
        merged.check_invariants().unwrap();
    }

    #[test]
    fn test_merge_everything_tombstoned() {
        let mut old = static_from(&[1, 2, 3], 0);
        for key in 1..=3u64 {
            old.lazy_erase(&key);
        }
        let mut dynamic: DynamicIndex<u64, u64> = DynamicIndex::new(4, 4);
        let (merged, report) = compact(&mut dynamic, old, 4, 4);
        assert!(merged.is_empty());
        assert_eq!(merged.height(), 1);
        assert_eq!(report.written, 0);
        merged.check_invariants().unwrap();
    }

    #[test]
    fn test_merge_uses_requested_orders() {
        let mut dynamic = DynamicIndex::new(4, 4);
        for key in 0..64u64 {
            dynamic.insert(key, key);
        }
        let (merged, _) = compact(&mut dynamic, StaticIndex::new(8, 16), 8, 16);
        assert_eq!(merged.leaf_count(), 4);
        assert_eq!(merged.height(), 2);
    }
}
