use pacer_buffer::{BufferError, RouteId};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no routes configured")]
    NoRoutes,

    #[error("duplicate route: {0}")]
    DuplicateRoute(RouteId),

    #[error("route {route}: invalid capacity {capacity}")]
    InvalidCapacity { route: RouteId, capacity: usize },

    #[error("route {route}: invalid occupancy threshold: {reason}")]
    InvalidThreshold { route: RouteId, reason: String },

    #[error("tick interval {0:?} outside 1ms..=1s")]
    TickOutOfRange(Duration),

    #[error("stats interval must be non-zero")]
    ZeroStatsInterval,

    #[error("invalid duration '{0}': {1}")]
    InvalidDuration(String, #[source] humantime::DurationError),

    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum DownstreamError {
    #[error("downstream not ready for route {0}")]
    NotReady(RouteId),

    #[error("no egress for route {0}")]
    UnknownRoute(RouteId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("unknown control message kind: {0}")]
    UnknownKind(String),

    #[error("unknown route: {0}")]
    InvalidRoute(RouteId),

    #[error("malformed control message: {0}")]
    Malformed(#[from] serde_json::Error),
}
