//! The single processing loop.
//!
//! Packets, control messages, ticks and the shutdown signal are all handled
//! here, one at a time, against one `Engine`.

use crate::egress::UdpDownstream;
use crate::error::DaemonError;
use crate::ingress::{self, Event, Listener};
use pacer_engine::{Admission, Config, Engine, RouteId, StatsSnapshot};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

const EVENT_QUEUE: usize = 4096;

pub struct Daemon {
    engine: Engine<UdpDownstream>,
    events: mpsc::Receiver<Event>,
    listeners: Vec<Listener>,
    stats_interval: Duration,
}

impl Daemon {
    pub async fn bind(config: &Config) -> Result<Self, DaemonError> {
        let downstream = UdpDownstream::bind(config).await?;
        let engine = Engine::new(config, downstream)?;
        let (tx, events) = mpsc::channel(EVENT_QUEUE);
        let listeners = ingress::spawn(config, tx).await?;

        Ok(Self {
            engine,
            events,
            listeners,
            stats_interval: config.stats_interval,
        })
    }

    pub fn ingress_addrs(&self) -> HashMap<RouteId, SocketAddr> {
        self.listeners
            .iter()
            .filter_map(|l| l.route.clone().map(|r| (r, l.local_addr)))
            .collect()
    }

    pub fn control_addr(&self) -> Option<SocketAddr> {
        self.listeners
            .iter()
            .find(|l| l.route.is_none())
            .map(|l| l.local_addr)
    }

    /// Run until `shutdown` resolves, then flush every route and return the
    /// final counters.
    pub async fn run_until<F>(mut self, shutdown: F) -> StatsSnapshot
    where
        F: Future<Output = ()>,
    {
        let mut tick = tokio::time::interval(self.engine.tick_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = tokio::time::interval(self.stats_interval);
        stats.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(tick = ?self.engine.tick_interval(), "Processing loop started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                Some(event) = self.events.recv() => self.dispatch(event),
                _ = tick.tick() => {
                    self.engine.on_tick(Instant::now());
                }
                _ = stats.tick() => log_stats(&self.engine.stats()),
            }
        }

        for listener in &self.listeners {
            listener.abort();
        }
        // Whatever the readers already queued still gets buffered.
        self.events.close();
        while let Ok(event) = self.events.try_recv() {
            self.dispatch(event);
        }

        let flushed = self.engine.shutdown();
        tracing::info!(routes = flushed.len(), "Final flush complete");
        let snapshot = self.engine.stats();
        log_stats(&snapshot);
        snapshot
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::Packet(packet) => {
                if self.engine.on_packet(packet) == Admission::Overflowed {
                    tracing::trace!("Packet overflowed");
                }
            }
            Event::Control(bytes) => {
                let outcome = self.engine.on_control_datagram(&bytes, Instant::now());
                tracing::debug!(?outcome, "Control message processed");
            }
        }
    }
}

fn log_stats(snapshot: &StatsSnapshot) {
    for (route, c) in &snapshot.routes {
        tracing::info!(
            route = %route,
            accepted = c.accepted,
            overflowed = c.overflowed,
            evicted = c.evicted,
            batches_sent = c.batches_sent,
            packets_sent = c.packets_sent,
            packets_lost = c.packets_lost,
            "Route stats"
        );
    }
    if snapshot.invalid_route > 0 {
        tracing::info!(invalid_route = snapshot.invalid_route, "Invalid route traffic");
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_engine::ControlMessage;
    use tokio::net::UdpSocket;
    use tokio::sync::oneshot;

    async fn recv(socket: &UdpSocket) -> Vec<u8> {
        let mut buf = [0u8; 1500];
        let n = tokio::time::timeout(Duration::from_secs(5), socket.recv(&mut buf))
            .await
            .expect("timed out waiting for datagram")
            .unwrap();
        buf[..n].to_vec()
    }

    fn config(forward: SocketAddr) -> Config {
        let text = format!(
            r#"
            tick_interval = "10ms"
            control = "127.0.0.1:0"

            [[routes]]
            name = "r"
            capacity = 8
            occupancy_threshold = 2
            max_latency = "1h"
            listen = "127.0.0.1:0"
            forward = "{}"
            "#,
            forward
        );
        Config::from_toml_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_flush_and_shutdown() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = config(receiver.local_addr().unwrap());
        let daemon = Daemon::bind(&config).await.unwrap();
        let ingress = daemon.ingress_addrs()[&RouteId::from("r")];
        let control = daemon.control_addr().unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let run = tokio::spawn(daemon.run_until(async {
            let _ = stop_rx.await;
        }));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"a", ingress).await.unwrap();
        sender.send_to(b"b", ingress).await.unwrap();
        assert_eq!(recv(&receiver).await, b"a");
        assert_eq!(recv(&receiver).await, b"b");

        let garbage = b"{\"type\":\"self_destruct\"}";
        sender.send_to(garbage, control).await.unwrap();
        let hold = ControlMessage::ReadinessUpdate {
            route: RouteId::from("r"),
            ready: false,
        };
        sender
            .send_to(&hold.encode().unwrap(), control)
            .await
            .unwrap();

        sender.send_to(b"c", ingress).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop_tx.send(()).unwrap();

        assert_eq!(recv(&receiver).await, b"c");
        let stats = run.await.unwrap();
        let counters = stats.route(&RouteId::from("r"));
        assert_eq!(counters.accepted, 3);
        assert_eq!(counters.packets_sent, 3);
        assert_eq!(counters.batches_sent, 2);
        assert_eq!(counters.packets_lost, 0);
    }
}
