use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Name of a logical output destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RouteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RouteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A pre-classified packet. The payload is never inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    route: RouteId,
    arrived_at: Instant,
    payload: Vec<u8>,
}

impl Packet {
    pub fn new(route: RouteId, payload: Vec<u8>, arrived_at: Instant) -> Self {
        Self {
            route,
            arrived_at,
            payload,
        }
    }

    pub fn route(&self) -> &RouteId {
        &self.route
    }

    pub fn arrived_at(&self) -> Instant {
        self.arrived_at
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Re-tags the packet for another route. Used when a reassignment
    /// redirects traffic before it reaches a bank.
    pub fn with_route(mut self, route: RouteId) -> Self {
        self.route = route;
        self
    }
}

/// Packets handed downstream in one call, in enqueue order.
#[derive(Debug, Clone)]
pub struct Batch {
    pub route: RouteId,
    pub packets: Vec<Packet>,
}

impl Batch {
    pub fn new(route: RouteId, packets: Vec<Packet>) -> Self {
        Self { route, packets }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.packets.iter().map(Packet::size).sum()
    }
}
