use std::time::Duration;

/// EWMA estimate of queue occupancy with idle-period compensation.
///
/// While the queue sits empty no arrivals drive the recurrence, so the
/// average would freeze at its last value. On the first arrival after an
/// idle period the estimator instead applies the decay `m` times, where `m`
/// approximates the number of packets the link would have served during the
/// gap.
#[derive(Debug)]
pub(crate) struct AvgEstimator {
    q_avg: f64,
    q_w: f64,
    /// Link capacity in packets per second.
    ptc: f64,
    idle: bool,
    idle_since: Duration,
}

impl AvgEstimator {
    /// Creates an estimator. The queue starts out idle with the idle period
    /// beginning at the clock epoch.
    pub(crate) fn new(q_w: f64, ptc: f64) -> Self {
        Self { q_avg: 0.0, q_w, ptc, idle: true, idle_since: Duration::ZERO }
    }

    pub(crate) fn q_avg(&self) -> f64 {
        self.q_avg
    }

    /// Records the start of an idle period.
    pub(crate) fn set_idle(&mut self, now: Duration) {
        self.idle = true;
        self.idle_since = now;
    }

    pub(crate) fn clear_idle(&mut self) {
        self.idle = false;
    }

    /// Updates the average for one arrival with `n_queued` currently
    /// resident (in the configured unit). Consumes the idle flag.
    pub(crate) fn estimate(&mut self, n_queued: u32, now: Duration) -> f64 {
        let m = if self.idle {
            self.idle = false;
            let gap = now.saturating_sub(self.idle_since).as_secs_f64();
            1.0 + (self.ptc * gap).floor()
        } else {
            1.0
        };

        self.q_avg = self.q_avg * (1.0 - self.q_w).powf(m) + self.q_w * f64::from(n_queued);
        self.q_avg
    }
}
