use std::hash::Hasher;
use std::net::IpAddr;

use rustc_hash::FxHasher;

use crate::packet::Packet;

/// Opaque flow identifier derived from packet header fields.
pub type FlowId = u64;

/// Classifies packets into flows. Filters are registered on the engine and
/// consulted in order; the first one to return an identifier wins. A packet
/// no filter can classify never matches any resident packet.
pub trait PacketFilter {
    fn classify(&self, packet: &Packet) -> Option<FlowId>;
}

fn hash_five_tuple(packet: &Packet) -> FlowId {
    let header = packet.header();
    let mut hasher = FxHasher::default();
    match header.src {
        IpAddr::V4(ip) => hasher.write(&ip.octets()),
        IpAddr::V6(ip) => hasher.write(&ip.octets()),
    }
    match header.dst {
        IpAddr::V4(ip) => hasher.write(&ip.octets()),
        IpAddr::V6(ip) => hasher.write(&ip.octets()),
    }
    hasher.write_u16(header.src_port);
    hasher.write_u16(header.dst_port);
    hasher.write_u8(header.protocol);
    hasher.finish()
}

/// Five-tuple filter for IPv4 packets.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ipv4FlowFilter;

impl PacketFilter for Ipv4FlowFilter {
    fn classify(&self, packet: &Packet) -> Option<FlowId> {
        match (packet.header().src, packet.header().dst) {
            (IpAddr::V4(_), IpAddr::V4(_)) => Some(hash_five_tuple(packet)),
            _ => None,
        }
    }
}

/// Five-tuple filter for IPv6 packets.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ipv6FlowFilter;

impl PacketFilter for Ipv6FlowFilter {
    fn classify(&self, packet: &Packet) -> Option<FlowId> {
        match (packet.header().src, packet.header().dst) {
            (IpAddr::V6(_), IpAddr::V6(_)) => Some(hash_five_tuple(packet)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::packet::FiveTuple;

    fn v4_packet(dst: &str) -> Packet {
        let header = FiveTuple {
            src: "10.10.1.1".parse().unwrap(),
            dst: dst.parse().unwrap(),
            src_port: 1000,
            dst_port: 2000,
            protocol: 7,
        };
        Packet::new(header, Bytes::from(vec![0u8; 100]))
    }

    #[test]
    fn same_tuple_same_flow() {
        let filter = Ipv4FlowFilter;
        let a = filter.classify(&v4_packet("10.10.1.2")).unwrap();
        let b = filter.classify(&v4_packet("10.10.1.2")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_tuples_distinct_flows() {
        let filter = Ipv4FlowFilter;
        let a = filter.classify(&v4_packet("10.10.1.2")).unwrap();
        let b = filter.classify(&v4_packet("10.10.1.3")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn v6_filter_ignores_v4_packets() {
        assert!(Ipv6FlowFilter.classify(&v4_packet("10.10.1.2")).is_none());
    }
}
