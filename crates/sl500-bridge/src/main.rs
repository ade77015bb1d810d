//! Bridge daemon: serial SL500 reader on one side, line-oriented TCP
//! control protocol on the other.
//!
//! Configuration comes from the environment:
//! - `SL500_DEVICE` - serial device path (default `/dev/ttyUSB0`)
//! - `SL500_BIND`   - listen address (default `0.0.0.0:3333`)
//! - `RUST_LOG`     - tracing filter (default `info`)

use anyhow::Context;
use sl500_core::LedState;
use sl500_core::constants::{CONTROL_PORT, DEFAULT_DEVICE_PATH, DEFAULT_LINE_RATE};
use sl500_network::{ControlServer, ServerConfig};
use sl500_reader::{ReaderContext, Sl500, open_endpoint};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct BridgeConfig {
    device_path: String,
    bind_addr: SocketAddr,
}

impl BridgeConfig {
    fn from_env() -> anyhow::Result<Self> {
        let device_path = std::env::var("SL500_DEVICE")
            .unwrap_or_else(|_| DEFAULT_DEVICE_PATH.to_string());
        let bind_addr = match std::env::var("SL500_BIND") {
            Ok(addr) => addr.parse().context("parsing SL500_BIND")?,
            Err(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, CONTROL_PORT)),
        };
        Ok(BridgeConfig {
            device_path,
            bind_addr,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BridgeConfig::from_env()?;
    info!(device = %config.device_path, addr = %config.bind_addr, "starting sl500 bridge");

    let endpoint = open_endpoint(&config.device_path, DEFAULT_LINE_RATE)
        .with_context(|| format!("opening serial device {}", config.device_path))?;
    let mut reader = Sl500::new(endpoint);

    // Known LED state before the poller takes over.
    reader
        .light(LedState::OFF)
        .await
        .context("initial LED off")?;

    let (command_tx, command_rx) = mpsc::channel(8);
    let (event_tx, event_rx) = mpsc::channel(8);

    let reader_plane = tokio::spawn(ReaderContext::new(reader, command_rx, event_tx).run());

    let server_config = ServerConfig {
        bind_addr: config.bind_addr,
    };
    let server = ControlServer::bind(&server_config, command_tx, event_rx).await?;
    let network_plane = tokio::spawn(server.run());

    // Either plane stopping is fatal; the service restarts from a clean
    // state rather than limping along half-connected.
    tokio::select! {
        res = reader_plane => res.context("reader plane task")??,
        res = network_plane => res.context("network plane task")??,
    }
    Ok(())
}
