use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BufferError {
    #[error("invalid capacity: {0}")]
    InvalidCapacity(usize),

    #[error("buffer {0} is still draining")]
    DrainInProgress(usize),
}
