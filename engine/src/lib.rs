pub mod config;
mod control;
mod downstream;
mod engine;
mod error;
mod policy;
mod route;
mod scheduler;
mod stats;

#[cfg(test)]
mod testing;

pub use config::{Config, RouteConfig, Threshold};
pub use control::{ControlChannel, ControlEffect, ControlMessage, ControlOutcome};
pub use downstream::Downstream;
pub use engine::{Admission, Engine};
pub use error::{ConfigError, ControlError, DownstreamError};
pub use policy::{FlushDecision, FlushInputs, FlushPolicy, FlushReason};
pub use route::Route;
pub use scheduler::{FlushOutcome, TransmissionScheduler};
pub use stats::{RouteCounters, RouteStats, StatsSnapshot};

pub use pacer_buffer::{Batch, EnqueueResult, OverflowPolicy, Packet, RouteId};
