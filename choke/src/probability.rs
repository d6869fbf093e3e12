use choke_queue::QueueMode;

/// Maps the average occupancy to the linear RED ramp: 0 below the minimum
/// threshold, `cur_max_p` at the maximum, 1 above it.
pub(crate) fn base_probability(q_avg: f64, max_th: f64, v_a: f64, v_b: f64, max_p: f64) -> f64 {
    let p = if q_avg >= max_th {
        1.0
    } else {
        (v_a * q_avg + v_b).clamp(0.0, 1.0) * max_p
    };
    p.min(1.0)
}

/// Applies the count-based correction to the base probability.
///
/// `count1` is the number of arrivals since the last probabilistic event
/// (expressed in mean packets when operating in byte mode). The waiting
/// variant suppresses the probability entirely for the first `1/p` arrivals
/// and then ramps it, which spaces unforced drops out more regularly than
/// the memoryless variant.
pub(crate) fn modify_probability(
    p: f64,
    count: u64,
    count_bytes: u64,
    mean_pkt_size: u32,
    wait: bool,
    size: u32,
    mode: QueueMode,
) -> f64 {
    let count1 = match mode {
        QueueMode::Packets => count as f64,
        // Integer division, deliberately: whole mean packets only.
        QueueMode::Bytes => (count_bytes / u64::from(mean_pkt_size)) as f64,
    };

    let mut p = p;
    if wait {
        if count1 * p < 1.0 {
            p = 0.0;
        } else if count1 * p < 2.0 {
            p /= 2.0 - count1 * p;
        } else {
            p = 1.0;
        }
    } else if count1 * p < 1.0 {
        p /= 1.0 - count1 * p;
    } else {
        p = 1.0;
    }

    if mode == QueueMode::Bytes && p < 1.0 {
        p = p * f64::from(size) / f64::from(mean_pkt_size);
    }

    p.min(1.0)
}

/// Per-arrival drop-probability bookkeeping: arrivals since the last
/// probabilistic event and the hysteresis flag tracking whether the average
/// already crossed the minimum threshold.
#[derive(Debug, Default)]
pub(crate) struct ProbabilityState {
    /// Packets since the last unforced drop/mark (or threshold crossing).
    count: u64,
    /// Bytes since the last unforced drop/mark.
    count_bytes: u64,
    /// Whether the average is already above the minimum threshold.
    old: bool,
    /// Last computed drop probability.
    v_prob: f64,
}

impl ProbabilityState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_old(&self) -> bool {
        self.old
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }

    pub(crate) fn count_bytes(&self) -> u64 {
        self.count_bytes
    }

    pub(crate) fn v_prob(&self) -> f64 {
        self.v_prob
    }

    pub(crate) fn set_v_prob(&mut self, v_prob: f64) {
        self.v_prob = v_prob;
    }

    /// Every arrival contributes to the inter-drop counters before the
    /// outcome is decided.
    pub(crate) fn record_arrival(&mut self, size: u32) {
        self.count += 1;
        self.count_bytes += u64::from(size);
    }

    /// The average just crossed the minimum threshold from below: restart
    /// the counters at this arrival.
    pub(crate) fn first_crossing(&mut self, size: u32) {
        self.count = 1;
        self.count_bytes = u64::from(size);
        self.old = true;
    }

    /// A probabilistic event fired (or ns-1 compatibility demanded a reset).
    pub(crate) fn reset_counts(&mut self) {
        self.count = 0;
        self.count_bytes = 0;
    }

    /// The average fell below the minimum threshold: drop the hysteresis.
    pub(crate) fn reset_hysteresis(&mut self) {
        self.v_prob = 0.0;
        self.old = false;
    }
}
