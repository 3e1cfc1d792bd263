//! Turns a flush decision into one batch handed to the downstream channel.

use crate::downstream::Downstream;
use crate::policy::FlushReason;
use crate::route::Route;
use pacer_buffer::Batch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered.
    Empty,
    /// The other buffer of the bank was still draining.
    Busy,
    Sent { packets: usize },
    Failed { lost: usize },
}

pub struct TransmissionScheduler<D> {
    downstream: D,
}

impl<D: Downstream> TransmissionScheduler<D> {
    pub fn new(downstream: D) -> Self {
        Self { downstream }
    }

    pub fn downstream(&self) -> &D {
        &self.downstream
    }

    pub fn downstream_mut(&mut self) -> &mut D {
        &mut self.downstream
    }

    pub fn into_downstream(self) -> D {
        self.downstream
    }

    /// Swap the route's buffers and send what the retired one held.
    ///
    /// A failed send is counted as lost and never re-enqueued.
    pub fn flush(&mut self, route: &Route, reason: FlushReason) -> FlushOutcome {
        let packets = match route.bank().swap_and_drain() {
            Ok(packets) => packets,
            Err(e) => {
                tracing::warn!(route = %route.id(), "Flush skipped: {}", e);
                return FlushOutcome::Busy;
            }
        };
        if packets.is_empty() {
            return FlushOutcome::Empty;
        }

        let batch = Batch::new(route.id().clone(), packets);
        let count = batch.len();
        let bytes = batch.total_bytes();

        match self.downstream.send_batch(batch) {
            Ok(()) => {
                route.stats().record_sent(count, bytes);
                tracing::debug!(
                    route = %route.id(),
                    packets = count,
                    bytes,
                    ?reason,
                    "Batch sent"
                );
                FlushOutcome::Sent { packets: count }
            }
            Err(e) => {
                route.stats().record_lost(count);
                tracing::warn!(
                    route = %route.id(),
                    batch_size = count,
                    ?reason,
                    "Downstream send failed: {}",
                    e
                );
                FlushOutcome::Failed { lost: count }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::testing::RecordingDownstream;
    use pacer_buffer::{Packet, RouteId};
    use std::time::Instant;

    fn route(capacity: usize) -> Route {
        Route::new(&RouteConfig::new("sat").with_capacity(capacity)).unwrap()
    }

    fn packet(tag: u8) -> Packet {
        Packet::new(RouteId::from("sat"), vec![tag], Instant::now())
    }

    #[test]
    fn test_flush_sends_one_batch_in_order() {
        let route = route(8);
        for tag in 1..=3 {
            route.enqueue(packet(tag));
        }
        let mut scheduler = TransmissionScheduler::new(RecordingDownstream::default());

        let outcome = scheduler.flush(&route, FlushReason::Threshold);
        assert_eq!(outcome, FlushOutcome::Sent { packets: 3 });
        assert_eq!(scheduler.downstream().payloads("sat"), vec![vec![1, 2, 3]]);

        let counters = route.stats().snapshot();
        assert_eq!(counters.batches_sent, 1);
        assert_eq!(counters.packets_sent, 3);
        assert_eq!(counters.bytes_sent, 3);
        assert_eq!(counters.packets_lost, 0);
    }

    #[test]
    fn test_flush_empty_sends_nothing() {
        let route = route(4);
        let mut scheduler = TransmissionScheduler::new(RecordingDownstream::default());
        assert_eq!(
            scheduler.flush(&route, FlushReason::Latency),
            FlushOutcome::Empty
        );
        assert!(scheduler.downstream().batches.is_empty());
    }

    #[test]
    fn test_send_failure_counts_batch_as_lost() {
        let route = route(8);
        for tag in 1..=3 {
            route.enqueue(packet(tag));
        }
        let mut scheduler = TransmissionScheduler::new(RecordingDownstream {
            fail_next: 1,
            ..Default::default()
        });

        assert_eq!(
            scheduler.flush(&route, FlushReason::Threshold),
            FlushOutcome::Failed { lost: 3 }
        );
        assert_eq!(route.bank().occupancy(), 0, "failed batch must not be re-enqueued");

        route.enqueue(packet(4));
        assert_eq!(
            scheduler.flush(&route, FlushReason::Threshold),
            FlushOutcome::Sent { packets: 1 }
        );
        assert_eq!(scheduler.downstream().payloads("sat"), vec![vec![4]]);

        let counters = route.stats().snapshot();
        assert_eq!(counters.packets_lost, 3);
        assert_eq!(counters.send_failures, 1);
        assert_eq!(counters.packets_sent, 1);
    }
}
