//! Counters reported by compaction.

/// Per-merge accounting returned by [`compact`](super::merge::compact).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// Entries drained from the dynamic stage.
    pub from_dynamic: usize,
    /// Live entries carried over from the old static stage.
    pub from_static: usize,
    /// Tombstoned static slots discarded.
    pub dropped_tombstones: usize,
    /// Live static entries discarded because the dynamic stage held the same key.
    pub dropped_shadowed: usize,
    /// Entries written to the new static stage.
    pub written: usize,
}

/// Cumulative compaction statistics for profiling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompactionStats {
    /// Number of merges performed.
    pub compactions: u64,
    /// Total entries written to rebuilt static stages.
    pub entries_written: u64,
    /// Total tombstones discarded by merges.
    pub dropped_tombstones: u64,
    /// Total time spent merging (nanoseconds).
    pub merge_time_ns: u64,
}

impl CompactionStats {
    pub(crate) fn record(&mut self, report: &MergeReport, elapsed_ns: u64) {
        self.compactions += 1;
        self.entries_written += report.written as u64;
        self.dropped_tombstones += report.dropped_tombstones as u64;
        self.merge_time_ns += elapsed_ns;
    }
}
