//! Common types and injected capabilities for the choke crates: packets,
//! flow classification, clocks and uniform random sources.

mod classify;
mod clock;
mod packet;
mod rng;

pub use classify::{FlowId, Ipv4FlowFilter, Ipv6FlowFilter, PacketFilter};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use packet::{FiveTuple, Packet};
pub use rng::{SeededUniform, UniformSource};
