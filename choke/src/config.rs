use std::time::Duration;

use choke_queue::QueueMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("minimum threshold {min_th} exceeds maximum threshold {max_th}")]
    ThresholdOrdering { min_th: f64, max_th: f64 },
    #[error("at least one packet filter must be registered")]
    NoPacketFilter,
    #[error("internal queue capacity {capacity} is smaller than the queue limit {queue_limit}")]
    CapacityBelowLimit { capacity: u32, queue_limit: u32 },
    #[error("{name} must be positive")]
    NonPositive { name: &'static str },
}

/// Knobs of the CHOKe engine. Set once before the first enqueue; the engine
/// takes an immutable copy at build time.
///
/// Defaults match the classic attribute values: thresholds 5/15 packets,
/// queue limit 25, EWMA weight 0.002, max drop probability 1/50, 500-byte
/// mean packet, 1.5 Mbps link with 20 ms delay.
#[derive(Debug, Clone)]
pub struct ChokeConfig {
    pub(crate) min_th: f64,
    pub(crate) max_th: f64,
    pub(crate) queue_limit: u32,
    /// EWMA weight. `0.0`, `-1.0` and `-2.0` select an auto-derived weight,
    /// see [`Derived::from_config`].
    pub(crate) q_w: f64,
    /// Inverse of the maximum drop probability.
    pub(crate) l_interm: f64,
    pub(crate) mean_pkt_size: u32,
    pub(crate) mode: QueueMode,
    /// Spread unforced drops out by suppressing the probability right after
    /// a drop. Produces wider, more regular inter-drop spacing than the
    /// memoryless variant.
    pub(crate) wait: bool,
    pub(crate) use_ecn: bool,
    /// Always drop (never mark) above the maximum threshold.
    pub(crate) use_hard_drop: bool,
    /// ns-1 compatibility: also reset the drop counters on a forced drop.
    pub(crate) ns1_compat: bool,
    /// Link bandwidth in bits per second, used to estimate arrivals during
    /// idle periods.
    pub(crate) link_bandwidth: u64,
    /// Link propagation delay, used by the RTT-based weight derivation.
    pub(crate) link_delay: Duration,
    /// Capacity of the internal queue. Defaults to `queue_limit`; an explicit
    /// value must not be smaller.
    pub(crate) capacity: Option<u32>,
}

impl Default for ChokeConfig {
    fn default() -> Self {
        Self {
            min_th: 5.0,
            max_th: 15.0,
            queue_limit: 25,
            q_w: 0.002,
            l_interm: 50.0,
            mean_pkt_size: 500,
            mode: QueueMode::Packets,
            wait: true,
            use_ecn: false,
            use_hard_drop: true,
            ns1_compat: false,
            link_bandwidth: 1_500_000,
            link_delay: Duration::from_millis(20),
            capacity: None,
        }
    }
}

impl ChokeConfig {
    /// Sets the minimum and maximum average occupancy thresholds, in the
    /// configured unit.
    pub fn thresholds(mut self, min_th: f64, max_th: f64) -> Self {
        self.min_th = min_th;
        self.max_th = max_th;
        self
    }

    /// Sets the queue limit, in the configured unit.
    pub fn queue_limit(mut self, limit: u32) -> Self {
        self.queue_limit = limit;
        self
    }

    /// Sets the EWMA weight. `0.0`, `-1.0` and `-2.0` trigger auto-derivation
    /// from the link parameters.
    pub fn weight(mut self, q_w: f64) -> Self {
        self.q_w = q_w;
        self
    }

    /// Sets the inverse of the maximum drop probability.
    pub fn l_interm(mut self, l_interm: f64) -> Self {
        self.l_interm = l_interm;
        self
    }

    /// Sets the mean packet size in bytes.
    pub fn mean_pkt_size(mut self, size: u32) -> Self {
        self.mean_pkt_size = size;
        self
    }

    /// Sets the unit for the queue limit and thresholds.
    pub fn mode(mut self, mode: QueueMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables or disables waiting between unforced drops.
    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Marks ECN-capable packets instead of dropping them.
    pub fn use_ecn(mut self, use_ecn: bool) -> Self {
        self.use_ecn = use_ecn;
        self
    }

    /// Always drops above the maximum threshold, even with ECN enabled.
    pub fn use_hard_drop(mut self, use_hard_drop: bool) -> Self {
        self.use_hard_drop = use_hard_drop;
        self
    }

    /// Enables ns-1 compatible counter resets on forced drops.
    pub fn ns1_compat(mut self, ns1_compat: bool) -> Self {
        self.ns1_compat = ns1_compat;
        self
    }

    /// Sets the link bandwidth in bits per second.
    pub fn link_bandwidth(mut self, bits_per_sec: u64) -> Self {
        self.link_bandwidth = bits_per_sec;
        self
    }

    /// Sets the link propagation delay.
    pub fn link_delay(mut self, delay: Duration) -> Self {
        self.link_delay = delay;
        self
    }

    /// Sets an explicit internal queue capacity. Must be at least the queue
    /// limit.
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Validates field-level constraints. The builder additionally checks
    /// that at least one packet filter is registered.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.min_th > self.max_th {
            return Err(ConfigError::ThresholdOrdering {
                min_th: self.min_th,
                max_th: self.max_th,
            });
        }
        if self.mean_pkt_size == 0 {
            return Err(ConfigError::NonPositive { name: "mean packet size" });
        }
        if self.link_bandwidth == 0 {
            return Err(ConfigError::NonPositive { name: "link bandwidth" });
        }
        if self.l_interm <= 0.0 {
            return Err(ConfigError::NonPositive { name: "lInterm" });
        }
        if self.queue_limit == 0 {
            return Err(ConfigError::NonPositive { name: "queue limit" });
        }
        let capacity = self.capacity.unwrap_or(self.queue_limit);
        if capacity < self.queue_limit {
            return Err(ConfigError::CapacityBelowLimit {
                capacity,
                queue_limit: self.queue_limit,
            });
        }
        Ok(())
    }
}

/// Constants derived from the configuration, computed once at build time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Derived {
    /// Link capacity in packets per second.
    pub(crate) ptc: f64,
    /// Slope of the linear drop-probability ramp between the thresholds.
    pub(crate) v_a: f64,
    /// Intercept of the ramp.
    pub(crate) v_b: f64,
    /// Maximum drop probability, `1 / lInterm`.
    pub(crate) cur_max_p: f64,
    /// Resolved EWMA weight.
    pub(crate) q_w: f64,
}

impl Derived {
    pub(crate) fn from_config(config: &ChokeConfig) -> Self {
        let ptc = config.link_bandwidth as f64 / (8.0 * f64::from(config.mean_pkt_size));

        let mut th_diff = config.max_th - config.min_th;
        if th_diff == 0.0 {
            th_diff = 1.0;
        }
        let v_a = 1.0 / th_diff;
        let v_b = -config.min_th / th_diff;
        let cur_max_p = 1.0 / config.l_interm;

        // Resolve the weight sentinels: 0 picks a time constant an order of
        // magnitude above the link capacity per default 100 ms RTT, -1 derives
        // it from the link delay, -2 uses a 10-packet time constant.
        let q_w = if config.q_w == 0.0 {
            1.0 - (-1.0 / ptc).exp()
        } else if config.q_w == -1.0 {
            let rtt = (3.0 * (config.link_delay.as_secs_f64() + 1.0 / ptc)).max(0.1);
            1.0 - (-1.0 / (10.0 * rtt * ptc)).exp()
        } else if config.q_w == -2.0 {
            1.0 - (-10.0 / ptc).exp()
        } else {
            config.q_w
        };

        Self { ptc, v_a, v_b, cur_max_p, q_w }
    }
}
