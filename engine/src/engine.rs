//! The route table and the ingress contract the host drives.
//!
//! All methods run on the host's single processing loop. Nothing here
//! returns an error for traffic problems: bad routes, full buffers and
//! failed sends are logged and counted, and processing carries on.

use crate::config::Config;
use crate::control::{ControlChannel, ControlEffect, ControlMessage, ControlOutcome};
use crate::downstream::Downstream;
use crate::error::{ConfigError, ControlError};
use crate::policy::{FlushDecision, FlushReason};
use crate::route::Route;
use crate::scheduler::{FlushOutcome, TransmissionScheduler};
use crate::stats::StatsSnapshot;
use pacer_buffer::{EnqueueResult, Packet, RouteId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Result of handing a packet to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Overflowed,
    InvalidRoute,
}

pub struct Engine<D> {
    routes: HashMap<RouteId, Route>,
    control: ControlChannel,
    scheduler: TransmissionScheduler<D>,
    invalid_route: AtomicU64,
    tick_interval: Duration,
}

impl<D: Downstream> Engine<D> {
    pub fn new(config: &Config, downstream: D) -> Result<Self, ConfigError> {
        let mut routes = HashMap::with_capacity(config.routes.len());
        for route_config in &config.routes {
            let route = Route::new(route_config)?;
            tracing::info!(
                route = %route_config.name,
                capacity = route_config.capacity,
                threshold = route_config.occupancy_threshold,
                max_latency = ?route_config.max_latency,
                overflow = ?route_config.overflow,
                "Route configured"
            );
            if routes.insert(route_config.name.clone(), route).is_some() {
                return Err(ConfigError::DuplicateRoute(route_config.name.clone()));
            }
        }

        Ok(Self {
            routes,
            control: ControlChannel::new(),
            scheduler: TransmissionScheduler::new(downstream),
            invalid_route: AtomicU64::new(0),
            tick_interval: config.effective_tick(),
        })
    }

    /// How often the host must call `on_tick`.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn route(&self, id: &RouteId) -> Option<&Route> {
        self.routes.get(id)
    }

    pub fn route_ids(&self) -> impl Iterator<Item = &RouteId> {
        self.routes.keys()
    }

    pub fn control(&self) -> &ControlChannel {
        &self.control
    }

    pub fn downstream(&self) -> &D {
        self.scheduler.downstream()
    }

    pub fn downstream_mut(&mut self) -> &mut D {
        self.scheduler.downstream_mut()
    }

    /// Buffer a packet under its (possibly reassigned) route, then let the
    /// flush policy look at that route.
    pub fn on_packet(&mut self, packet: Packet) -> Admission {
        let now = packet.arrived_at();
        let target = self.control.resolve(packet.route()).clone();

        let Some(route) = self.routes.get_mut(&target) else {
            self.invalid_route.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(route = %target, "Packet for unknown route dropped");
            return Admission::InvalidRoute;
        };

        let packet = if packet.route() != &target {
            packet.with_route(target)
        } else {
            packet
        };

        let admission = match route.enqueue(packet) {
            EnqueueResult::Accepted => Admission::Accepted,
            EnqueueResult::Overflowed { .. } => Admission::Overflowed,
        };
        evaluate(route, &mut self.scheduler, now);
        admission
    }

    pub fn on_control_message(&mut self, message: ControlMessage, now: Instant) -> ControlOutcome {
        match self.control.apply(message, &mut self.routes) {
            Ok(ControlEffect::Readiness {
                route,
                regained: true,
            }) => {
                if let Some(entry) = self.routes.get_mut(&route) {
                    evaluate(entry, &mut self.scheduler, now);
                }
                ControlOutcome::Handled
            }
            Ok(_) => ControlOutcome::Handled,
            Err(ControlError::InvalidRoute(route)) => {
                self.invalid_route.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(route = %route, "Control message for unknown route ignored");
                ControlOutcome::Ignored
            }
            Err(e) => {
                tracing::warn!("Control message ignored: {}", e);
                ControlOutcome::Ignored
            }
        }
    }

    /// Decode a raw control message and apply it.
    pub fn on_control_datagram(&mut self, bytes: &[u8], now: Instant) -> ControlOutcome {
        match ControlMessage::decode(bytes) {
            Ok(message) => self.on_control_message(message, now),
            Err(e) => {
                tracing::warn!(len = bytes.len(), "Control message ignored: {}", e);
                ControlOutcome::Ignored
            }
        }
    }

    /// Periodic re-evaluation of every route. Also polls the downstream for
    /// readiness if it supports that.
    pub fn on_tick(&mut self, now: Instant) -> Vec<(RouteId, FlushOutcome)> {
        let mut flushed = Vec::new();
        for route in self.routes.values_mut() {
            if let Some(ready) = self.scheduler.downstream().query_ready(route.id()) {
                if route.set_ready(ready) {
                    tracing::info!(route = %route.id(), ready, "Downstream readiness polled");
                }
            }
            if let Some(outcome) = evaluate(route, &mut self.scheduler, now) {
                flushed.push((route.id().clone(), outcome));
            }
        }
        flushed
    }

    /// Best-effort final flush of every route, ignoring thresholds.
    pub fn shutdown(&mut self) -> Vec<(RouteId, FlushOutcome)> {
        let mut flushed = Vec::new();
        for route in self.routes.values() {
            if route.bank().occupancy() == 0 {
                continue;
            }
            let outcome = self.scheduler.flush(route, FlushReason::Shutdown);
            tracing::info!(route = %route.id(), ?outcome, "Final flush");
            flushed.push((route.id().clone(), outcome));
        }
        flushed
    }

    /// Packets currently buffered across all routes.
    pub fn buffered(&self) -> usize {
        self.routes.values().map(|r| r.bank().occupancy()).sum()
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            routes: self
                .routes
                .iter()
                .map(|(id, route)| (id.clone(), route.stats().snapshot()))
                .collect(),
            invalid_route: self.invalid_route.load(Ordering::Relaxed),
        }
    }

    pub fn into_downstream(self) -> D {
        self.scheduler.into_downstream()
    }
}

fn evaluate<D: Downstream>(
    route: &mut Route,
    scheduler: &mut TransmissionScheduler<D>,
    now: Instant,
) -> Option<FlushOutcome> {
    match route.decide(now) {
        FlushDecision::Hold => None,
        FlushDecision::Flush(reason) => Some(scheduler.flush(route, reason)),
    }
}
