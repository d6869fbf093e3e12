//! A bounded FIFO of packets with random-access removal and reinsertion.
//!
//! This is the internal queue behind the choke engine. Besides the usual
//! head/tail operations it supports `remove_at` / `insert_at`, which the
//! engine's flow-match sampler uses to pull out a random resident packet and
//! put it back in place when it does not match the arrival.

use std::collections::VecDeque;

use choke_common::Packet;

/// Unit in which the queue capacity (and the engine's thresholds) are
/// expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueMode {
    /// Capacity counted in packets.
    #[default]
    Packets,
    /// Capacity counted in payload bytes.
    Bytes,
}

/// Bounded ordered packet sequence with incremental packet/byte accounting.
///
/// An enqueue that would exceed the capacity fails without mutating state and
/// hands the packet back to the caller.
#[derive(Debug, Default)]
pub struct PacketQueue {
    items: VecDeque<Packet>,
    /// Total payload bytes currently resident.
    bytes: u64,
    mode: QueueMode,
    capacity: u32,
}

impl PacketQueue {
    pub fn new(mode: QueueMode, capacity: u32) -> Self {
        Self { items: VecDeque::new(), bytes: 0, mode, capacity }
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of resident packets.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Total resident payload bytes.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current occupancy in the configured unit.
    pub fn size(&self) -> u32 {
        match self.mode {
            QueueMode::Packets => self.items.len() as u32,
            QueueMode::Bytes => self.bytes as u32,
        }
    }

    /// Appends a packet at the tail. Returns the packet unchanged if it would
    /// push occupancy past the capacity.
    pub fn push_back(&mut self, packet: Packet) -> Result<(), Packet> {
        let fits = match self.mode {
            QueueMode::Packets => self.items.len() < self.capacity as usize,
            QueueMode::Bytes => self.bytes + u64::from(packet.size()) <= u64::from(self.capacity),
        };
        if !fits {
            return Err(packet);
        }

        self.bytes += u64::from(packet.size());
        self.items.push_back(packet);
        Ok(())
    }

    /// Removes and returns the head packet.
    pub fn pop_front(&mut self) -> Option<Packet> {
        let packet = self.items.pop_front()?;
        self.bytes -= u64::from(packet.size());
        Some(packet)
    }

    /// Read-only view of the head packet.
    pub fn peek(&self) -> Option<&Packet> {
        self.items.front()
    }

    /// Removes and returns the packet at `index`, shifting later packets
    /// forward without reordering them.
    pub fn remove_at(&mut self, index: usize) -> Option<Packet> {
        let packet = self.items.remove(index)?;
        self.bytes -= u64::from(packet.size());
        Some(packet)
    }

    /// Reinserts a packet at `index`, restoring the order a `remove_at` at
    /// the same index disturbed. No capacity check: this is only used to put
    /// back a packet that was just removed.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_at(&mut self, index: usize, packet: Packet) {
        self.bytes += u64::from(packet.size());
        self.items.insert(index, packet);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use choke_common::FiveTuple;

    use super::*;

    fn packet(src_port: u16, size: usize) -> Packet {
        let header = FiveTuple {
            src: "10.10.1.1".parse().unwrap(),
            dst: "10.10.1.2".parse().unwrap(),
            src_port,
            dst_port: 2000,
            protocol: 7,
        };
        Packet::new(header, Bytes::from(vec![0u8; size]))
    }

    #[test]
    fn fifo_order() {
        let mut queue = PacketQueue::new(QueueMode::Packets, 10);
        for port in 0..5 {
            queue.push_back(packet(port, 100)).unwrap();
        }

        for port in 0..5 {
            assert_eq!(queue.pop_front().unwrap().header().src_port, port);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn packet_capacity_rejects_without_mutation() {
        let mut queue = PacketQueue::new(QueueMode::Packets, 2);
        queue.push_back(packet(1, 100)).unwrap();
        queue.push_back(packet(2, 100)).unwrap();

        let rejected = queue.push_back(packet(3, 100)).unwrap_err();
        assert_eq!(rejected.header().src_port, 3);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.bytes(), 200);
    }

    #[test]
    fn byte_capacity_counts_payload() {
        let mut queue = PacketQueue::new(QueueMode::Bytes, 250);
        queue.push_back(packet(1, 100)).unwrap();
        queue.push_back(packet(2, 100)).unwrap();
        assert!(queue.push_back(packet(3, 100)).is_err());
        assert_eq!(queue.size(), 200);

        // A smaller packet still fits.
        queue.push_back(packet(4, 50)).unwrap();
        assert_eq!(queue.size(), 250);
    }

    #[test]
    fn remove_then_insert_restores_order_and_occupancy() {
        let mut queue = PacketQueue::new(QueueMode::Packets, 10);
        for port in 0..5 {
            queue.push_back(packet(port, 100)).unwrap();
        }

        let removed = queue.remove_at(2).unwrap();
        assert_eq!(removed.header().src_port, 2);
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.bytes(), 400);

        queue.insert_at(2, removed);
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.bytes(), 500);
        for port in 0..5 {
            assert_eq!(queue.pop_front().unwrap().header().src_port, port);
        }
    }

    #[test]
    fn remove_at_out_of_bounds_is_none() {
        let mut queue = PacketQueue::new(QueueMode::Packets, 10);
        queue.push_back(packet(1, 100)).unwrap();
        assert!(queue.remove_at(1).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut queue = PacketQueue::new(QueueMode::Packets, 10);
        queue.push_back(packet(9, 100)).unwrap();
        assert_eq!(queue.peek().unwrap().header().src_port, 9);
        assert_eq!(queue.len(), 1);
    }
}
