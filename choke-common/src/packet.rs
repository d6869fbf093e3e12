use std::net::IpAddr;

use bytes::Bytes;

/// The classic five-tuple identifying a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiveTuple {
    pub src: IpAddr,
    pub dst: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    /// IP protocol number (e.g. 6 for TCP, 17 for UDP).
    pub protocol: u8,
}

/// A packet handed to the queue engine. Ownership transfers to the engine on
/// acceptance and is returned to the caller on dequeue.
#[derive(Debug, Clone)]
pub struct Packet {
    header: FiveTuple,
    /// The packet payload.
    payload: Bytes,
    /// Whether the endpoints negotiated ECN for this packet.
    ecn_capable: bool,
    marked: bool,
}

impl Packet {
    pub fn new(header: FiveTuple, payload: Bytes) -> Self {
        Self { header, payload, ecn_capable: false, marked: false }
    }

    /// Flags the packet as ECN-capable, making it eligible for congestion
    /// marking instead of dropping.
    pub fn ecn_capable(mut self) -> Self {
        self.ecn_capable = true;
        self
    }

    pub fn header(&self) -> &FiveTuple {
        &self.header
    }

    /// Returns the packet size in bytes.
    pub fn size(&self) -> u32 {
        self.payload.len() as u32
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Sets the congestion-experienced bit. Returns `false` if the packet is
    /// not ECN-capable, in which case the caller takes the drop path instead.
    pub fn mark(&mut self) -> bool {
        if !self.ecn_capable {
            return false;
        }
        self.marked = true;
        true
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple() -> FiveTuple {
        FiveTuple {
            src: "10.10.1.1".parse().unwrap(),
            dst: "10.10.1.2".parse().unwrap(),
            src_port: 1000,
            dst_port: 2000,
            protocol: 7,
        }
    }

    #[test]
    fn mark_requires_ecn_capability() {
        let mut packet = Packet::new(tuple(), Bytes::from(vec![0u8; 100]));
        assert!(!packet.mark());
        assert!(!packet.is_marked());

        let mut packet = Packet::new(tuple(), Bytes::from(vec![0u8; 100])).ecn_capable();
        assert!(packet.mark());
        assert!(packet.is_marked());
    }

    #[test]
    fn size_is_payload_len() {
        let packet = Packet::new(tuple(), Bytes::from(vec![0u8; 512]));
        assert_eq!(packet.size(), 512);
    }
}
