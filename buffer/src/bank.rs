//! Double-buffered packet storage for one route.
//!
//! One ring accepts packets while the other is drained into a batch. The
//! selector lock is always taken before a ring lock, and neither is held
//! once `swap_and_drain` returns, so producers never wait on a downstream
//! send.

use crate::error::BufferError;
use crate::packet::Packet;
use crate::ring::RingBuffer;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// What to do when the active ring is full.
///
/// An occupancy threshold can be at most the capacity. So an engine that
/// evaluates its flush policy after every enqueue drains a full ring before
/// the next packet arrives. The policy only takes effect when that flush
/// cannot run: the previous batch is still draining, or other threads enqueue
/// into a shared bank between evaluations. In the single-loop daemon,
/// `DropOldest` and `Reject` therefore behave the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Drop the incoming packet.
    #[default]
    Reject,
    /// Evict the oldest buffered packet, then store the incoming one.
    DropOldest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    Accepted,
    /// The active ring was full. With `DropOldest` the oldest packet was
    /// evicted and the new one stored (`evicted_oldest == true`); with
    /// `Reject` the new packet was dropped.
    Overflowed { evicted_oldest: bool },
}

struct Selector {
    active: usize,
    draining: [bool; 2],
}

pub struct BufferBank {
    selector: Mutex<Selector>,
    rings: [Mutex<RingBuffer>; 2],
    policy: OverflowPolicy,
    capacity: usize,
}

impl BufferBank {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Result<Self, BufferError> {
        let primary = RingBuffer::new(capacity)?;
        let secondary = RingBuffer::new(capacity)?;
        Ok(Self {
            selector: Mutex::new(Selector {
                active: 0,
                draining: [false, false],
            }),
            rings: [Mutex::new(primary), Mutex::new(secondary)],
            policy,
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Index of the ring currently accepting packets (0 = primary).
    pub fn active_index(&self) -> usize {
        self.lock_selector().active
    }

    pub fn enqueue(&self, packet: Packet) -> EnqueueResult {
        let selector = self.lock_selector();
        let mut ring = self.lock_ring(selector.active);

        let packet = match ring.enqueue(packet) {
            Ok(()) => return EnqueueResult::Accepted,
            Err(packet) => packet,
        };

        match self.policy {
            OverflowPolicy::Reject => {
                tracing::trace!(route = %packet.route(), "Active buffer full, packet rejected");
                EnqueueResult::Overflowed {
                    evicted_oldest: false,
                }
            }
            OverflowPolicy::DropOldest => {
                ring.discard_oldest();
                let stored = ring.enqueue(packet).is_ok();
                debug_assert!(stored, "ring full right after eviction");
                EnqueueResult::Overflowed {
                    evicted_oldest: stored,
                }
            }
        }
    }

    /// Make the idle ring active and return everything the retired ring
    /// held, oldest first.
    pub fn swap_and_drain(&self) -> Result<Vec<Packet>, BufferError> {
        let retired = {
            let mut selector = self.lock_selector();
            let retired = selector.active;
            let next = 1 - retired;
            if selector.draining[next] {
                return Err(BufferError::DrainInProgress(next));
            }
            selector.draining[retired] = true;
            selector.active = next;
            retired
        };

        let packets = self.lock_ring(retired).dequeue_all();
        self.lock_selector().draining[retired] = false;
        Ok(packets)
    }

    /// Packets waiting in the active ring.
    pub fn occupancy(&self) -> usize {
        let selector = self.lock_selector();
        self.lock_ring(selector.active).len()
    }

    /// Arrival time of the oldest packet in the active ring.
    pub fn oldest_timestamp(&self) -> Option<Instant> {
        let selector = self.lock_selector();
        self.lock_ring(selector.active).peek_oldest_timestamp()
    }

    fn lock_selector(&self) -> MutexGuard<'_, Selector> {
        self.selector.lock().expect("buffer selector mutex poisoned")
    }

    fn lock_ring(&self, index: usize) -> MutexGuard<'_, RingBuffer> {
        self.rings[index].lock().expect("packet ring mutex poisoned")
    }
}
