//! CHOKe ("CHOose and Keep for responsive flows, CHOose and Kill for
//! unresponsive flows") active queue management.
//!
//! The engine decides, on every packet arrival, whether to accept,
//! probabilistically drop, forcibly drop, or ECN-mark the packet. It combines
//! a RED-style EWMA occupancy estimate with a stochastic fairness check: when
//! the average occupancy is above the minimum threshold, the arrival is
//! compared against a randomly chosen resident packet, and both are dropped
//! if they belong to the same flow. Unresponsive flows occupy more of the
//! buffer and therefore lose these duels more often.
//!
//! Decisions are reproducible: inject seeded [`UniformSource`] streams and a
//! [`ManualClock`] and a given arrival sequence always yields the same
//! accept/drop/mark sequence.
//!
//! ```
//! use choke::{ChokeConfig, ChokeQueue, FiveTuple, Ipv4FlowFilter, Packet, SeededUniform};
//!
//! let config = ChokeConfig::default().thresholds(70.0, 150.0).queue_limit(300);
//! let mut queue = ChokeQueue::builder(config)
//!     .filter(Ipv4FlowFilter)
//!     .drop_rng(SeededUniform::new(1))
//!     .index_rng(SeededUniform::new(2))
//!     .build()
//!     .unwrap();
//!
//! let header = FiveTuple {
//!     src: "10.10.1.1".parse().unwrap(),
//!     dst: "10.10.1.2".parse().unwrap(),
//!     src_port: 1000,
//!     dst_port: 2000,
//!     protocol: 7,
//! };
//! assert!(queue.enqueue(Packet::new(header, bytes::Bytes::from_static(&[0; 100]))));
//! assert_eq!(queue.queue_size(), 1);
//! ```

mod config;
mod engine;
mod estimator;
mod probability;
mod stats;

pub use config::{ChokeConfig, ConfigError};
pub use engine::{ChokeQueue, ChokeQueueBuilder};
pub use stats::ChokeStats;

pub use choke_common::{
    Clock, FiveTuple, FlowId, Ipv4FlowFilter, Ipv6FlowFilter, ManualClock, MonotonicClock, Packet,
    PacketFilter, SeededUniform, UniformSource,
};
pub use choke_queue::{PacketQueue, QueueMode};
