use crate::downstream::Downstream;
use crate::error::DownstreamError;
use pacer_buffer::{Batch, RouteId};
use std::collections::HashMap;

/// Downstream that records every batch and can be told to fail.
#[derive(Default)]
pub struct RecordingDownstream {
    pub batches: Vec<Batch>,
    pub fail_next: usize,
    pub polled: HashMap<RouteId, bool>,
}

impl RecordingDownstream {
    pub fn payloads(&self, route: &str) -> Vec<Vec<u8>> {
        self.batches
            .iter()
            .filter(|b| b.route.as_str() == route)
            .map(|b| b.packets.iter().flat_map(|p| p.payload().to_vec()).collect())
            .collect()
    }
}

impl Downstream for RecordingDownstream {
    fn send_batch(&mut self, batch: Batch) -> Result<(), DownstreamError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(DownstreamError::NotReady(batch.route));
        }
        self.batches.push(batch);
        Ok(())
    }

    fn query_ready(&self, route: &RouteId) -> Option<bool> {
        self.polled.get(route).copied()
    }
}
