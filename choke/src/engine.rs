use std::fmt;

use tracing::{debug, trace};

use choke_common::{
    Clock, FlowId, MonotonicClock, Packet, PacketFilter, SeededUniform, UniformSource,
};
use choke_queue::{PacketQueue, QueueMode};

use crate::config::{ChokeConfig, ConfigError, Derived};
use crate::estimator::AvgEstimator;
use crate::probability::{base_probability, modify_probability, ProbabilityState};
use crate::stats::ChokeStats;

/// Per-arrival outcome classification. Computed fresh for every arrival,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    None,
    Forced,
    Unforced,
}

/// Builder for a [`ChokeQueue`]. Collects the configuration, the packet
/// filters and the injected capabilities, then validates everything in
/// [`build`](Self::build); on failure no engine state is created.
pub struct ChokeQueueBuilder {
    config: ChokeConfig,
    filters: Vec<Box<dyn PacketFilter>>,
    clock: Box<dyn Clock>,
    drop_rng: Box<dyn UniformSource>,
    index_rng: Box<dyn UniformSource>,
    on_drop: Option<Box<dyn FnMut(Packet)>>,
}

impl ChokeQueueBuilder {
    fn new(config: ChokeConfig) -> Self {
        Self {
            config,
            filters: Vec::new(),
            clock: Box::new(MonotonicClock::new()),
            drop_rng: Box::new(SeededUniform::from_entropy()),
            index_rng: Box::new(SeededUniform::from_entropy()),
            on_drop: None,
        }
    }

    /// Registers a packet filter. Filters are consulted in registration
    /// order; the first match wins. At least one filter is required.
    pub fn filter(mut self, filter: impl PacketFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Sets the clock used to measure idle periods.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Sets the random stream driving the drop decision.
    pub fn drop_rng(mut self, rng: impl UniformSource + 'static) -> Self {
        self.drop_rng = Box::new(rng);
        self
    }

    /// Sets the random stream driving the flow-match index draw.
    pub fn index_rng(mut self, rng: impl UniformSource + 'static) -> Self {
        self.index_rng = Box::new(rng);
        self
    }

    /// Registers a callback invoked with every dropped packet, for the
    /// surrounding traffic-control layer. Dropped packets are destroyed
    /// after the callback returns.
    pub fn on_drop(mut self, on_drop: impl FnMut(Packet) + 'static) -> Self {
        self.on_drop = Some(Box::new(on_drop));
        self
    }

    /// Validates the configuration and constructs the engine.
    pub fn build(self) -> Result<ChokeQueue, ConfigError> {
        self.config.validate()?;
        if self.filters.is_empty() {
            return Err(ConfigError::NoPacketFilter);
        }

        let derived = Derived::from_config(&self.config);
        let capacity = self.config.capacity.unwrap_or(self.config.queue_limit);

        debug!(
            ptc = derived.ptc,
            q_w = derived.q_w,
            v_a = derived.v_a,
            v_b = derived.v_b,
            cur_max_p = derived.cur_max_p,
            "initialized choke parameters"
        );

        Ok(ChokeQueue {
            queue: PacketQueue::new(self.config.mode, capacity),
            estimator: AvgEstimator::new(derived.q_w, derived.ptc),
            prob: ProbabilityState::new(),
            stats: ChokeStats::default(),
            tracked_len: 0,
            config: self.config,
            derived,
            filters: self.filters,
            clock: self.clock,
            drop_rng: self.drop_rng,
            index_rng: self.index_rng,
            on_drop: self.on_drop,
        })
    }
}

impl fmt::Debug for ChokeQueueBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChokeQueueBuilder")
            .field("config", &self.config)
            .field("filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}

/// A CHOKe-managed packet queue.
///
/// Every arrival runs one synchronous decision: update the occupancy
/// average, optionally duel the arrival against a random resident packet,
/// classify the outcome as forced/unforced/none, apply the ECN and hard-drop
/// policy, and commit to the internal queue or reject. The caller must
/// serialize all arrival and departure calls against one instance.
pub struct ChokeQueue {
    config: ChokeConfig,
    derived: Derived,
    queue: PacketQueue,
    estimator: AvgEstimator,
    prob: ProbabilityState,
    stats: ChokeStats,
    filters: Vec<Box<dyn PacketFilter>>,
    clock: Box<dyn Clock>,
    drop_rng: Box<dyn UniformSource>,
    index_rng: Box<dyn UniformSource>,
    on_drop: Option<Box<dyn FnMut(Packet)>>,
    /// Packets committed minus packets handed out, cross-checked against the
    /// queue's own accounting on every arrival.
    tracked_len: usize,
}

impl ChokeQueue {
    /// Starts building an engine with the given configuration.
    pub fn builder(config: ChokeConfig) -> ChokeQueueBuilder {
        ChokeQueueBuilder::new(config)
    }

    /// Offers a packet to the queue. Returns `true` if the packet was
    /// accepted (possibly ECN-marked), `false` if it was dropped. Rejection
    /// is normal control flow; exactly one terminal counter is incremented
    /// per arrival.
    pub fn enqueue(&mut self, mut packet: Packet) -> bool {
        // Occupancy diverging from our own ledger would corrupt every
        // probability computed from here on.
        assert_eq!(
            self.tracked_len,
            self.queue.len(),
            "tracked occupancy diverged from queue occupancy"
        );

        let n_queued = self.queue.size();
        let q_avg = self.estimator.estimate(n_queued, self.clock.now());
        trace!(q_avg, n_queued, "updated average occupancy");

        self.prob.record_arrival(packet.size());

        let mut outcome = Outcome::None;
        if q_avg >= self.config.min_th {
            if self.queue.len() > 1 && self.flow_match(&packet) {
                self.stats.random_drop += 2;
                debug!(q_avg, "flow match, dropping arrival");
                self.notify_drop(packet);
                return false;
            }

            if q_avg >= self.config.max_th {
                outcome = Outcome::Forced;
            } else if !self.prob.is_old() {
                // The average just crossed the minimum threshold from below.
                self.prob.first_crossing(packet.size());
            } else if self.drop_early(q_avg, packet.size()) {
                outcome = Outcome::Unforced;
            }
        } else {
            self.prob.reset_hysteresis();
        }

        match outcome {
            Outcome::Unforced => {
                if !self.config.use_ecn || !packet.mark() {
                    debug!(q_avg, "dropping due to probability mark");
                    self.stats.unforced_drop += 1;
                    self.notify_drop(packet);
                    return false;
                }
                debug!(q_avg, "marking due to probability mark");
                self.stats.unforced_mark += 1;
            }
            Outcome::Forced => {
                if self.config.use_hard_drop || !self.config.use_ecn || !packet.mark() {
                    debug!(q_avg, "dropping due to hard mark");
                    self.stats.forced_drop += 1;
                    if self.config.ns1_compat {
                        self.prob.reset_counts();
                    }
                    self.notify_drop(packet);
                    return false;
                }
                debug!(q_avg, "marking due to hard mark");
                self.stats.forced_mark += 1;
            }
            Outcome::None => {}
        }

        match self.queue.push_back(packet) {
            Ok(()) => {
                self.tracked_len += 1;
                trace!(
                    packets = self.queue.len(),
                    bytes = self.queue.bytes(),
                    "packet committed"
                );
                true
            }
            Err(packet) => {
                self.stats.q_lim_drop += 1;
                self.notify_drop(packet);
                false
            }
        }
    }

    /// Removes and returns the head packet. A call on an empty queue records
    /// the idle-period start for the occupancy estimator.
    pub fn dequeue(&mut self) -> Option<Packet> {
        if self.queue.is_empty() {
            trace!("queue empty, recording idle start");
            self.estimator.set_idle(self.clock.now());
            return None;
        }

        self.estimator.clear_idle();
        let packet = self.queue.pop_front();
        if packet.is_some() {
            self.tracked_len -= 1;
        }
        packet
    }

    /// Read-only view of the head packet.
    pub fn peek(&self) -> Option<&Packet> {
        self.queue.peek()
    }

    /// Snapshot of the per-outcome counters.
    pub fn stats(&self) -> ChokeStats {
        self.stats
    }

    /// Current occupancy in the configured unit.
    pub fn queue_size(&self) -> u32 {
        self.queue.size()
    }

    /// The unit in which the queue limit and thresholds are expressed.
    pub fn mode(&self) -> QueueMode {
        self.config.mode
    }

    /// Last computed average occupancy.
    pub fn q_avg(&self) -> f64 {
        self.estimator.q_avg()
    }

    fn classify(&self, packet: &Packet) -> Option<FlowId> {
        self.filters.iter().find_map(|filter| filter.classify(packet))
    }

    /// Draws a random resident packet and compares flow identities with the
    /// arrival. On a match the resident packet is dropped and `true` is
    /// returned so the caller rejects the arrival as well; otherwise the
    /// resident packet goes back to its original position.
    fn flow_match(&mut self, arrival: &Packet) -> bool {
        let residents = self.queue.len();
        let index = self.index_rng.uniform(0.0, residents as f64) as usize;
        let index = index.min(residents - 1);

        let resident = match self.queue.remove_at(index) {
            Some(resident) => resident,
            None => return false,
        };

        // A packet no filter can classify never matches any flow.
        let matched = match (self.classify(arrival), self.classify(&resident)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };

        if matched {
            trace!(index, "resident packet shares the arrival's flow");
            self.tracked_len -= 1;
            self.notify_drop(resident);
            true
        } else {
            self.queue.insert_at(index, resident);
            false
        }
    }

    /// Probabilistic drop decision between the thresholds.
    fn drop_early(&mut self, q_avg: f64, size: u32) -> bool {
        let base = base_probability(
            q_avg,
            self.config.max_th,
            self.derived.v_a,
            self.derived.v_b,
            self.derived.cur_max_p,
        );
        let p = modify_probability(
            base,
            self.prob.count(),
            self.prob.count_bytes(),
            self.config.mean_pkt_size,
            self.config.wait,
            size,
            self.config.mode,
        );
        self.prob.set_v_prob(p);

        let u = self.drop_rng.uniform(0.0, 1.0);
        if u <= p {
            trace!(u, p, "drop-early fired");
            self.prob.reset_counts();
            return true;
        }
        false
    }

    fn notify_drop(&mut self, packet: Packet) {
        if let Some(on_drop) = &mut self.on_drop {
            on_drop(packet);
        }
    }
}

impl fmt::Debug for ChokeQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChokeQueue")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .field("queue_size", &self.queue.size())
            .field("q_avg", &self.estimator.q_avg())
            .finish_non_exhaustive()
    }
}
