use crate::error::DownstreamError;
use pacer_buffer::{Batch, RouteId};

/// The channel batches are handed to.
///
/// `send_batch` must not block; "accepted by the channel" is the delivery
/// boundary. Anything past it (retries, acknowledgements) is the channel's
/// business.
pub trait Downstream {
    fn send_batch(&mut self, batch: Batch) -> Result<(), DownstreamError>;

    /// Polled readiness for `route`. `None` means the channel only pushes
    /// readiness through control messages.
    fn query_ready(&self, _route: &RouteId) -> Option<bool> {
        None
    }
}

impl<D: Downstream + ?Sized> Downstream for Box<D> {
    fn send_batch(&mut self, batch: Batch) -> Result<(), DownstreamError> {
        (**self).send_batch(batch)
    }

    fn query_ready(&self, route: &RouteId) -> Option<bool> {
        (**self).query_ready(route)
    }
}
