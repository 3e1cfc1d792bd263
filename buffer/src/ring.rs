//! Fixed-capacity packet ring.
//!
//! Slots are allocated once at construction and addressed by head/tail
//! cursors, so steady-state enqueue/drain never reallocates the slot array.
//! The ring itself is not synchronized; `BufferBank` wraps it in a mutex.

use crate::error::BufferError;
use crate::packet::Packet;
use std::time::Instant;

/// Slots per ring when the configuration doesn't say otherwise.
pub const DEFAULT_CAPACITY: usize = 400;

/// Bounded FIFO of packets.
pub struct RingBuffer {
    slots: Box<[Option<Packet>]>,
    head: usize,
    tail: usize,
    count: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidCapacity(capacity));
        }
        let slots: Vec<Option<Packet>> = (0..capacity).map(|_| None).collect();
        Ok(Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Append a packet at the tail.
    /// Hands the packet back if the ring is full; the caller decides what
    /// overflow means.
    pub fn enqueue(&mut self, packet: Packet) -> Result<(), Packet> {
        if self.is_full() {
            return Err(packet);
        }
        self.slots[self.tail] = Some(packet);
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
        Ok(())
    }

    /// Remove and return the packet at the head.
    pub fn discard_oldest(&mut self) -> Option<Packet> {
        if self.is_empty() {
            return None;
        }
        let packet = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        packet
    }

    /// Remove every packet, oldest first.
    pub fn dequeue_all(&mut self) -> Vec<Packet> {
        let mut out = Vec::with_capacity(self.count);
        let cap = self.capacity();
        for i in 0..self.count {
            if let Some(packet) = self.slots[(self.head + i) % cap].take() {
                out.push(packet);
            }
        }
        self.head = self.tail;
        self.count = 0;
        out
    }

    pub fn peek_oldest_timestamp(&self) -> Option<Instant> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.head].as_ref().map(Packet::arrived_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::RouteId;
    use std::time::Duration;

    fn packet(tag: u8, at: Instant) -> Packet {
        Packet::new(RouteId::from("r"), vec![tag], at)
    }

    fn tags(packets: &[Packet]) -> Vec<u8> {
        packets.iter().map(|p| p.payload()[0]).collect()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            RingBuffer::new(0).err(),
            Some(BufferError::InvalidCapacity(0))
        );
    }

    #[test]
    fn test_fifo_drain() {
        let now = Instant::now();
        let mut ring = RingBuffer::new(8).unwrap();
        for tag in 1..=5 {
            ring.enqueue(packet(tag, now)).unwrap();
        }
        assert_eq!(ring.len(), 5);

        let drained = ring.dequeue_all();
        assert_eq!(tags(&drained), vec![1, 2, 3, 4, 5]);
        assert!(ring.is_empty());
        assert!(ring.dequeue_all().is_empty());
    }

    #[test]
    fn test_full_ring_returns_packet() {
        let now = Instant::now();
        let mut ring = RingBuffer::new(2).unwrap();
        ring.enqueue(packet(1, now)).unwrap();
        ring.enqueue(packet(2, now)).unwrap();

        let rejected = ring.enqueue(packet(3, now)).unwrap_err();
        assert_eq!(rejected.payload(), &[3]);
        assert_eq!(ring.len(), 2);
        assert!(ring.is_full());
        assert_eq!(tags(&ring.dequeue_all()), vec![1, 2]);
    }

    #[test]
    fn test_wraps_after_repeated_drains() {
        let now = Instant::now();
        let mut ring = RingBuffer::new(3).unwrap();
        for round in 0..5u8 {
            let base = round * 10;
            ring.enqueue(packet(base + 1, now)).unwrap();
            ring.enqueue(packet(base + 2, now)).unwrap();
            assert_eq!(tags(&ring.dequeue_all()), vec![base + 1, base + 2]);
        }
    }

    #[test]
    fn test_discard_oldest() {
        let now = Instant::now();
        let mut ring = RingBuffer::new(3).unwrap();
        assert!(ring.discard_oldest().is_none());

        ring.enqueue(packet(1, now)).unwrap();
        ring.enqueue(packet(2, now)).unwrap();
        ring.enqueue(packet(3, now)).unwrap();

        let dropped = ring.discard_oldest().unwrap();
        assert_eq!(dropped.payload(), &[1]);
        ring.enqueue(packet(4, now)).unwrap();
        assert_eq!(tags(&ring.dequeue_all()), vec![2, 3, 4]);
    }

    #[test]
    fn test_peek_oldest_timestamp() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(5);
        let mut ring = RingBuffer::new(4).unwrap();
        assert_eq!(ring.peek_oldest_timestamp(), None);

        ring.enqueue(packet(1, t0)).unwrap();
        ring.enqueue(packet(2, t1)).unwrap();
        assert_eq!(ring.peek_oldest_timestamp(), Some(t0));

        ring.discard_oldest();
        assert_eq!(ring.peek_oldest_timestamp(), Some(t1));
    }
}
