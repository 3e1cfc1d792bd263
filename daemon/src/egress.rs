//! UDP egress: each route's batches go to its `forward` address.

use crate::error::DaemonError;
use pacer_engine::{Batch, Config, Downstream, DownstreamError, RouteId};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

pub struct UdpDownstream {
    socket: UdpSocket,
    targets: HashMap<RouteId, SocketAddr>,
}

impl UdpDownstream {
    pub async fn bind(config: &Config) -> Result<Self, DaemonError> {
        let targets = config
            .routes
            .iter()
            .map(|r| {
                r.forward
                    .map(|addr| (r.name.clone(), addr))
                    .ok_or_else(|| DaemonError::MissingForward(r.name.clone()))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        let bind_addr = if targets.values().any(SocketAddr::is_ipv6) {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        tracing::info!(local = %socket.local_addr()?, "Egress socket bound");
        Ok(Self::new(socket, targets))
    }

    pub fn new(socket: UdpSocket, targets: HashMap<RouteId, SocketAddr>) -> Self {
        Self { socket, targets }
    }
}

impl Downstream for UdpDownstream {
    /// Writes every packet without waiting. A full socket buffer fails the
    /// whole batch.
    fn send_batch(&mut self, batch: Batch) -> Result<(), DownstreamError> {
        let target = *self
            .targets
            .get(&batch.route)
            .ok_or_else(|| DownstreamError::UnknownRoute(batch.route.clone()))?;

        for packet in &batch.packets {
            self.socket.try_send_to(packet.payload(), target)?;
        }
        tracing::trace!(route = %batch.route, packets = batch.len(), %target, "Batch written");
        Ok(())
    }
}
