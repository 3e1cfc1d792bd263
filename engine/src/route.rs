use crate::config::RouteConfig;
use crate::error::ConfigError;
use crate::policy::{FlushDecision, FlushInputs, FlushPolicy};
use crate::stats::RouteStats;
use pacer_buffer::{BufferBank, EnqueueResult, Packet, RouteId};
use std::sync::Arc;
use std::time::Instant;

/// Downstream readiness as last reported for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Readiness {
    ready: bool,
    regained: bool,
}

/// One entry of the route table: its buffers, flush policy, readiness and
/// counters.
pub struct Route {
    id: RouteId,
    bank: BufferBank,
    policy: FlushPolicy,
    readiness: Readiness,
    stats: Arc<RouteStats>,
}

impl Route {
    pub fn new(config: &RouteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            id: config.name.clone(),
            bank: BufferBank::new(config.capacity, config.overflow)?,
            policy: FlushPolicy::new(config.occupancy_threshold, config.max_latency),
            // Channels are assumed usable until they say otherwise.
            readiness: Readiness {
                ready: true,
                regained: false,
            },
            stats: Arc::new(RouteStats::default()),
        })
    }

    pub fn id(&self) -> &RouteId {
        &self.id
    }

    pub fn bank(&self) -> &BufferBank {
        &self.bank
    }

    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &Arc<RouteStats> {
        &self.stats
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.ready
    }

    /// Record a readiness report. Returns true if it changed the flag.
    pub fn set_ready(&mut self, ready: bool) -> bool {
        if ready == self.readiness.ready {
            return false;
        }
        self.readiness.ready = ready;
        self.readiness.regained = ready;
        true
    }

    pub(crate) fn enqueue(&self, packet: Packet) -> EnqueueResult {
        let result = self.bank.enqueue(packet);
        match result {
            EnqueueResult::Accepted => self.stats.record_accepted(),
            EnqueueResult::Overflowed { evicted_oldest } => {
                self.stats.record_overflow(evicted_oldest);
                tracing::debug!(route = %self.id, evicted_oldest, "Buffer overflow");
            }
        }
        result
    }

    pub fn flush_inputs(&self) -> FlushInputs {
        FlushInputs {
            occupancy: self.bank.occupancy(),
            oldest: self.bank.oldest_timestamp(),
            ready: self.readiness.ready,
            readiness_regained: self.readiness.regained,
        }
    }

    /// Evaluate the flush policy. A pending readiness edge is consumed by
    /// this call whatever the outcome.
    pub(crate) fn decide(&mut self, now: Instant) -> FlushDecision {
        let decision = self.policy.decide(&self.flush_inputs(), now);
        self.readiness.regained = false;
        decision
    }
}
