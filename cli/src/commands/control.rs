use clap::Subcommand;
use pacer_engine::{ControlMessage, RouteId};
use tokio::net::UdpSocket;

#[derive(Subcommand)]
pub enum ControlCommands {
    /// Report downstream readiness for a route
    Ready {
        /// Route name
        route: String,

        /// Mark the downstream as unavailable instead
        #[arg(long)]
        down: bool,
    },
    /// Redirect new packets for one route to another route's buffers
    Reassign {
        /// Route whose incoming packets are redirected
        from: String,

        /// Route that receives them; pass the same name to clear
        to: String,
    },
}

impl ControlCommands {
    fn into_message(self) -> ControlMessage {
        match self {
            ControlCommands::Ready { route, down } => ControlMessage::ReadinessUpdate {
                route: RouteId::from(route),
                ready: !down,
            },
            ControlCommands::Reassign { from, to } => ControlMessage::RouteReassign {
                from: RouteId::from(from),
                to: RouteId::from(to),
            },
        }
    }
}

pub async fn handle_control_command(
    addr: &str,
    cmd: ControlCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let message = cmd.into_message();
    let bytes = message.encode()?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket
        .send_to(&bytes, addr)
        .await
        .map_err(|e| format!("Failed to reach daemon at {}: {}", addr, e))?;

    tracing::debug!("Sent {} bytes to {}", bytes.len(), addr);
    println!("Sent {:?} to {}", message, addr);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ready_down_maps_to_not_ready() {
        let msg = ControlCommands::Ready {
            route: "sat".into(),
            down: true,
        }
        .into_message();
        assert_eq!(
            msg,
            ControlMessage::ReadinessUpdate {
                route: RouteId::from("sat"),
                ready: false
            }
        );
    }

    #[tokio::test]
    async fn test_message_reaches_control_socket() {
        let daemon = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = daemon.local_addr().unwrap().to_string();

        handle_control_command(
            &addr,
            ControlCommands::Reassign {
                from: "a".into(),
                to: "b".into(),
            },
        )
        .await
        .unwrap();

        let mut buf = [0u8; 512];
        let n = tokio::time::timeout(Duration::from_secs(2), daemon.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            ControlMessage::decode(&buf[..n]).unwrap(),
            ControlMessage::RouteReassign {
                from: RouteId::from("a"),
                to: RouteId::from("b"),
            }
        );
    }
}
