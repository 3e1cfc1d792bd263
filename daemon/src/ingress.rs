//! Socket readers feeding the processing loop.
//!
//! Each route's `listen` socket and the control socket get their own task.
//! Tasks only forward what they read; all engine state stays on the loop.

use crate::error::DaemonError;
use pacer_engine::{Config, Packet, RouteId};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const MAX_DATAGRAM: usize = 65535;

pub enum Event {
    Packet(Packet),
    Control(Vec<u8>),
}

pub struct Listener {
    pub route: Option<RouteId>,
    pub local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Listener {
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Bind every ingress and control socket named in `config`.
pub async fn spawn(
    config: &Config,
    tx: mpsc::Sender<Event>,
) -> Result<Vec<Listener>, DaemonError> {
    let mut listeners = Vec::new();

    for route in &config.routes {
        let Some(addr) = route.listen else {
            tracing::warn!(
                route = %route.name,
                "Route has no listen address; reachable only by reassignment"
            );
            continue;
        };
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        tracing::info!(route = %route.name, %local_addr, "Ingress listening");

        let name = route.name.clone();
        let tx = tx.clone();
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((n, _peer)) => {
                        let packet = Packet::new(name.clone(), buf[..n].to_vec(), Instant::now());
                        if tx.send(Event::Packet(packet)).await.is_err() {
                            tracing::debug!(route = %name, "Event channel closed");
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(route = %name, "Error receiving packet: {}", e),
                }
            }
        });
        listeners.push(Listener {
            route: Some(route.name.clone()),
            local_addr,
            handle,
        });
    }

    if let Some(addr) = config.control {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        tracing::info!(%local_addr, "Control socket listening");

        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((n, peer)) => {
                        tracing::debug!(%peer, len = n, "Control message received");
                        if tx.send(Event::Control(buf[..n].to_vec())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Error receiving control message: {}", e),
                }
            }
        });
        listeners.push(Listener {
            route: None,
            local_addr,
            handle,
        });
    }

    Ok(listeners)
}
