//! Control messages from the host pipeline.
//!
//! On the wire a message is a JSON object tagged by `type`:
//!
//! ```json
//! {"type": "readiness_update", "route": "satlink", "ready": true}
//! {"type": "route_reassign", "from": "satlink", "to": "ground"}
//! ```
//!
//! Reassignment only affects packets that arrive afterwards; whatever is
//! already buffered drains through its original bank.

use crate::error::ControlError;
use crate::route::Route;
use pacer_buffer::RouteId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const KNOWN_KINDS: &[&str] = &["readiness_update", "route_reassign"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    ReadinessUpdate { route: RouteId, ready: bool },
    RouteReassign { from: RouteId, to: RouteId },
}

impl ControlMessage {
    pub fn decode(bytes: &[u8]) -> Result<Self, ControlError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if let Some(kind) = value.get("type").and_then(serde_json::Value::as_str) {
            if !KNOWN_KINDS.contains(&kind) {
                return Err(ControlError::UnknownKind(kind.to_string()));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ControlError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Handled,
    Ignored,
}

/// What applying a message changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEffect {
    /// Readiness flag changed; `regained` is set on a false -> true edge.
    Readiness { route: RouteId, regained: bool },
    Reassigned { from: RouteId, to: RouteId },
    Cleared { route: RouteId },
    Unchanged,
}

/// Holds the reassignment map and applies control messages to the route
/// table.
#[derive(Debug, Default)]
pub struct ControlChannel {
    redirects: HashMap<RouteId, RouteId>,
}

impl ControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route an incoming packet tagged `route` should be buffered under.
    /// Redirects are a single hop.
    pub fn resolve<'a>(&'a self, route: &'a RouteId) -> &'a RouteId {
        self.redirects.get(route).unwrap_or(route)
    }

    pub fn redirects(&self) -> &HashMap<RouteId, RouteId> {
        &self.redirects
    }

    pub fn apply(
        &mut self,
        message: ControlMessage,
        routes: &mut HashMap<RouteId, Route>,
    ) -> Result<ControlEffect, ControlError> {
        match message {
            ControlMessage::ReadinessUpdate { route, ready } => {
                let entry = routes
                    .get_mut(&route)
                    .ok_or_else(|| ControlError::InvalidRoute(route.clone()))?;
                if !entry.set_ready(ready) {
                    return Ok(ControlEffect::Unchanged);
                }
                tracing::info!(route = %route, ready, "Downstream readiness changed");
                Ok(ControlEffect::Readiness {
                    route,
                    regained: ready,
                })
            }
            ControlMessage::RouteReassign { from, to } => {
                for id in [&from, &to] {
                    if !routes.contains_key(id) {
                        return Err(ControlError::InvalidRoute(id.clone()));
                    }
                }
                if from == to {
                    if self.redirects.remove(&from).is_some() {
                        tracing::info!(route = %from, "Route reassignment cleared");
                        return Ok(ControlEffect::Cleared { route: from });
                    }
                    return Ok(ControlEffect::Unchanged);
                }
                tracing::info!(from = %from, to = %to, "Route reassigned");
                self.redirects.insert(from.clone(), to.clone());
                Ok(ControlEffect::Reassigned { from, to })
            }
        }
    }
}
