use pacer_engine::{ConfigError, RouteId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("route {0} has no forward address")]
    MissingForward(RouteId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
