use pacer_buffer::RouteId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one route. Readers only ever load.
#[derive(Debug, Default)]
pub struct RouteStats {
    accepted: AtomicU64,
    overflowed: AtomicU64,
    evicted: AtomicU64,
    batches_sent: AtomicU64,
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    send_failures: AtomicU64,
    packets_lost: AtomicU64,
}

impl RouteStats {
    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow(&self, evicted_oldest: bool) {
        self.overflowed.fetch_add(1, Ordering::Relaxed);
        if evicted_oldest {
            self.evicted.fetch_add(1, Ordering::Relaxed);
            self.accepted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_sent(&self, packets: usize, bytes: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.packets_sent.fetch_add(packets as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_lost(&self, packets: usize) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
        self.packets_lost.fetch_add(packets as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RouteCounters {
        RouteCounters {
            accepted: self.accepted.load(Ordering::Relaxed),
            overflowed: self.overflowed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            packets_lost: self.packets_lost.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteCounters {
    /// Packets stored in a buffer, including ones stored after an eviction.
    pub accepted: u64,
    /// Enqueues that found the active buffer full.
    pub overflowed: u64,
    /// Packets discarded by the drop-oldest policy.
    pub evicted: u64,
    pub batches_sent: u64,
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub send_failures: u64,
    pub packets_lost: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub routes: BTreeMap<RouteId, RouteCounters>,
    /// Packets and control messages naming a route that isn't configured.
    pub invalid_route: u64,
}

impl StatsSnapshot {
    pub fn route(&self, route: &RouteId) -> RouteCounters {
        self.routes.get(route).copied().unwrap_or_default()
    }
}
