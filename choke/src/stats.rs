/// Per-outcome counters of the engine. Snapshots are cheap copies; every
/// counter is monotonically non-decreasing over a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChokeStats {
    /// Drops because the average occupancy reached the maximum threshold.
    pub forced_drop: u64,
    /// Early probabilistic drops between the thresholds.
    pub unforced_drop: u64,
    /// Drops because the queue limit was reached.
    pub q_lim_drop: u64,
    /// ECN marks instead of forced drops.
    pub forced_mark: u64,
    /// ECN marks instead of unforced drops.
    pub unforced_mark: u64,
    /// Drops by the flow-match sampler, counted per packet (a matched pair
    /// contributes 2).
    pub random_drop: u64,
}

impl ChokeStats {
    /// Total packets dropped, across all drop causes.
    pub fn total_drops(&self) -> u64 {
        self.forced_drop + self.unforced_drop + self.q_lim_drop + self.random_drop
    }

    /// Total packets marked instead of dropped.
    pub fn total_marks(&self) -> u64 {
        self.forced_mark + self.unforced_mark
    }
}
