//! TCP control server.

use crate::parser::LineBuffer;
use sl500_core::constants::{CONTROL_PORT, MAX_CLIENT_PROTOCOL_LEN, SERVER_PROTOCOL_VERSION};
use sl500_core::{BridgeCommand, BridgeEvent};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Network-plane failures.
///
/// Per-session I/O errors are handled inside the accept loop; only listener
/// and channel failures escape [`ControlServer::run`].
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("{0} channel closed")]
    ChannelClosed(&'static str),
}

/// Where the control server listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, CONTROL_PORT)),
        }
    }
}

/// Outcome of one protocol line.
enum LineOutcome {
    Continue,
    CloseSession,
}

/// Serves one client at a time over the line protocol and bridges
/// `wait_for_card` to the reader plane.
#[derive(Debug)]
pub struct ControlServer {
    listener: TcpListener,
    commands: mpsc::Sender<BridgeCommand>,
    events: mpsc::Receiver<BridgeEvent>,
}

impl ControlServer {
    /// Bind the listening socket.
    pub async fn bind(
        config: &ServerConfig,
        commands: mpsc::Sender<BridgeCommand>,
        events: mpsc::Receiver<BridgeEvent>,
    ) -> crate::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        info!(addr = %listener.local_addr()?, "control server listening");
        Ok(ControlServer {
            listener,
            commands,
            events,
        })
    }

    /// Actual bound address; useful when binding to port 0.
    pub fn local_addr(&self) -> crate::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop. A failed session is logged and the next client is
    /// accepted; a closed bridge channel is fatal.
    pub async fn run(mut self) -> crate::Result<()> {
        loop {
            let (mut stream, peer) = self.listener.accept().await?;
            debug!(%peer, "client connected");

            match self.session(&mut stream).await {
                Ok(()) => debug!(%peer, "client disconnected"),
                Err(err @ ServerError::ChannelClosed(_)) => return Err(err),
                Err(err) => warn!(%peer, %err, "session ended with error"),
            }
        }
    }

    /// Serve one client until it exits or disconnects.
    async fn session(&mut self, stream: &mut TcpStream) -> crate::Result<()> {
        let mut lines = LineBuffer::new();
        let mut handshaken = false;
        let mut chunk = [0u8; 256];

        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }

            for &byte in &chunk[..n] {
                let Some(line) = lines.push(byte) else {
                    continue;
                };
                match self.handle_line(stream, &mut handshaken, &line).await? {
                    LineOutcome::Continue => {}
                    LineOutcome::CloseSession => return Ok(()),
                }
            }
        }
    }

    async fn handle_line(
        &mut self,
        stream: &mut TcpStream,
        handshaken: &mut bool,
        line: &str,
    ) -> crate::Result<LineOutcome> {
        if let Some(version) = line.strip_prefix("client_protocol ") {
            // The advertised version is not interpreted, only bounded.
            if (1..=MAX_CLIENT_PROTOCOL_LEN).contains(&version.len()) {
                debug!(%version, "handshake");
                *handshaken = true;
                stream
                    .write_all(format!("server_protocol {SERVER_PROTOCOL_VERSION}\n").as_bytes())
                    .await?;
                return Ok(LineOutcome::Continue);
            }
        }

        if line == "exit" {
            return Ok(LineOutcome::CloseSession);
        }

        if *handshaken && line == "wait_for_card" {
            self.commands
                .send(BridgeCommand::WaitForCard)
                .await
                .map_err(|_| ServerError::ChannelClosed("bridge commands"))?;

            let BridgeEvent::CardDetected(uid) = self
                .events
                .recv()
                .await
                .ok_or(ServerError::ChannelClosed("card events"))?;

            info!(%uid, "reporting card to client");
            stream
                .write_all(format!("card_detected {uid}\n").as_bytes())
                .await?;
            return Ok(LineOutcome::Continue);
        }

        let reply: &[u8] = if *handshaken {
            b"Syntax error\n"
        } else {
            b"Please provide protocol version.\n"
        };
        stream.write_all(reply).await?;
        Ok(LineOutcome::Continue)
    }
}
