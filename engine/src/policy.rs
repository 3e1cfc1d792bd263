//! Flush timing.
//!
//! `FlushPolicy::decide` is a pure function of the route's occupancy, the age
//! of its oldest packet, its readiness state and the current time.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    /// Packets in the active buffer that force a flush.
    pub occupancy_threshold: usize,
    /// Longest a packet may wait in the active buffer while the downstream
    /// is ready.
    pub max_latency: Duration,
}

/// Snapshot of a route taken right before deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushInputs {
    pub occupancy: usize,
    pub oldest: Option<Instant>,
    pub ready: bool,
    /// Readiness went false -> true and no decision has consumed it yet.
    pub readiness_regained: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Threshold,
    Latency,
    ReadinessRegained,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDecision {
    Hold,
    Flush(FlushReason),
}

impl FlushDecision {
    pub fn is_flush(&self) -> bool {
        matches!(self, FlushDecision::Flush(_))
    }
}

impl FlushPolicy {
    pub fn new(occupancy_threshold: usize, max_latency: Duration) -> Self {
        Self {
            occupancy_threshold,
            max_latency,
        }
    }

    pub fn decide(&self, inputs: &FlushInputs, now: Instant) -> FlushDecision {
        if inputs.occupancy == 0 {
            return FlushDecision::Hold;
        }
        if inputs.occupancy >= self.occupancy_threshold {
            return FlushDecision::Flush(FlushReason::Threshold);
        }
        if inputs.readiness_regained {
            return FlushDecision::Flush(FlushReason::ReadinessRegained);
        }
        // While the downstream is unavailable, aged packets are held rather
        // than sent into a channel that would drop them.
        if inputs.ready {
            if let Some(oldest) = inputs.oldest {
                if now.saturating_duration_since(oldest) >= self.max_latency {
                    return FlushDecision::Flush(FlushReason::Latency);
                }
            }
        }
        FlushDecision::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FlushPolicy {
        FlushPolicy::new(4, Duration::from_millis(1000))
    }

    fn inputs(occupancy: usize, oldest: Option<Instant>) -> FlushInputs {
        FlushInputs {
            occupancy,
            oldest,
            ready: true,
            readiness_regained: false,
        }
    }

    #[test]
    fn test_empty_never_flushes() {
        let now = Instant::now();
        let long_ago = Some(now);
        let later = now + Duration::from_secs(60);

        let mut i = inputs(0, long_ago);
        assert_eq!(policy().decide(&i, later), FlushDecision::Hold);

        i.readiness_regained = true;
        assert_eq!(policy().decide(&i, later), FlushDecision::Hold);
    }

    #[test]
    fn test_threshold_flushes_regardless_of_time_and_readiness() {
        let now = Instant::now();
        let mut i = inputs(4, Some(now));
        assert_eq!(
            policy().decide(&i, now),
            FlushDecision::Flush(FlushReason::Threshold)
        );

        i.ready = false;
        assert_eq!(
            policy().decide(&i, now),
            FlushDecision::Flush(FlushReason::Threshold)
        );
    }

    #[test]
    fn test_latency_trigger() {
        let t0 = Instant::now();
        let i = inputs(1, Some(t0));
        assert_eq!(
            policy().decide(&i, t0 + Duration::from_millis(999)),
            FlushDecision::Hold
        );
        assert_eq!(
            policy().decide(&i, t0 + Duration::from_millis(1000)),
            FlushDecision::Flush(FlushReason::Latency)
        );
    }

    #[test]
    fn test_latency_held_while_not_ready() {
        let t0 = Instant::now();
        let mut i = inputs(1, Some(t0));
        i.ready = false;
        assert_eq!(
            policy().decide(&i, t0 + Duration::from_secs(5)),
            FlushDecision::Hold
        );
    }

    #[test]
    fn test_readiness_regained_flushes_below_thresholds() {
        let t0 = Instant::now();
        let mut i = inputs(1, Some(t0));
        i.readiness_regained = true;
        assert_eq!(
            policy().decide(&i, t0),
            FlushDecision::Flush(FlushReason::ReadinessRegained)
        );
    }

    #[test]
    fn test_clock_before_oldest_does_not_panic() {
        let t0 = Instant::now();
        let i = inputs(1, Some(t0 + Duration::from_secs(1)));
        assert_eq!(policy().decide(&i, t0), FlushDecision::Hold);
    }
}
