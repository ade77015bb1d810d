//! In-process SL500 emulator for tests.
//!
//! [`MockReader::spawn`] wires a duplex pipe to a background task that
//! speaks the device side of the frame protocol. The returned endpoint
//! plugs into [`crate::Sl500`] exactly like a serial port; the handle lets
//! a test present and remove cards and inspect what the "hardware" was
//! told to do.

use sl500_core::constants::DEFAULT_LINE_RATE;
use sl500_core::{DeviceAddress, LedState, Result, Status};
use sl500_protocol::{CommandCode, Request, Response, Sl500DeviceCodec};

use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::serial::LineControl;

const MODEL: &[u8] = b"SL500-USB";
const CAPACITY_1K: u8 = 0x08;

/// Everything the emulated hardware remembers.
#[derive(Debug, Default)]
struct MockState {
    card: Option<Vec<u8>>,
    beeps: Vec<u8>,
    lights: Vec<LedState>,
    negotiated_rate: Option<u8>,
    device_number: [u8; 2],
    blocks: HashMap<u8, [u8; 16]>,
}

/// Test-side handle to the emulated reader.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock")
    }

    /// Place a card in the field. `payload` is the raw anti-collision
    /// response; four bytes make a regular UID, other lengths exercise the
    /// malformed-UID paths.
    pub fn present_card(&self, payload: Vec<u8>) {
        self.lock().card = Some(payload);
    }

    /// Take the card out of the field.
    pub fn remove_card(&self) {
        self.lock().card = None;
    }

    /// Beep durations received, in order.
    #[must_use]
    pub fn beeps(&self) -> Vec<u8> {
        self.lock().beeps.clone()
    }

    /// LED masks received, in order.
    #[must_use]
    pub fn lights(&self) -> Vec<LedState> {
        self.lock().lights.clone()
    }

    /// Rate code from the last accepted `init_com`, if any.
    #[must_use]
    pub fn negotiated_rate(&self) -> Option<u8> {
        self.lock().negotiated_rate
    }

    /// Stored device number.
    #[must_use]
    pub fn device_number(&self) -> [u8; 2] {
        self.lock().device_number
    }

    /// Contents of a data block; unwritten blocks read as zero.
    #[must_use]
    pub fn block(&self, block: u8) -> [u8; 16] {
        self.lock().blocks.get(&block).copied().unwrap_or_default()
    }
}

/// Host-side endpoint of the mock pipe.
///
/// Tracks the line rate the host believes it configured so tests can
/// observe `init_com` renegotiation without real termios.
#[derive(Debug)]
pub struct MockEndpoint {
    inner: DuplexStream,
    rate: u32,
}

impl MockEndpoint {
    /// Line rate last configured on the host side.
    #[must_use]
    pub fn line_rate(&self) -> u32 {
        self.rate
    }
}

impl LineControl for MockEndpoint {
    fn set_line_rate(&mut self, bps: u32) -> Result<()> {
        self.rate = bps;
        Ok(())
    }
}

impl AsyncRead for MockEndpoint {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockEndpoint {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Emulated SL500 reader.
pub struct MockReader;

impl MockReader {
    /// Spawn the device task and return the host endpoint plus the test
    /// handle. The task exits when the endpoint is dropped.
    #[must_use]
    pub fn spawn() -> (MockEndpoint, MockHandle) {
        let (host, device) = tokio::io::duplex(512);
        let state = Arc::new(Mutex::new(MockState::default()));

        tokio::spawn(run_device(device, Arc::clone(&state)));

        (
            MockEndpoint {
                inner: host,
                rate: DEFAULT_LINE_RATE,
            },
            MockHandle { state },
        )
    }
}

async fn run_device(endpoint: DuplexStream, state: Arc<Mutex<MockState>>) {
    let mut framed = Framed::new(endpoint, Sl500DeviceCodec::new());

    while let Some(request) = framed.next().await {
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                debug!(%err, "mock device: bad frame, stopping");
                return;
            }
        };

        let response = handle(&state, &request);
        if framed.send(response).await.is_err() {
            return;
        }
    }
}

fn handle(state: &Mutex<MockState>, request: &Request) -> Response {
    let mut state = state.lock().expect("mock state lock");
    let param = request.param.as_ref();

    let (status, data): (Status, Vec<u8>) = match request.command {
        CommandCode::InitCom => {
            state.negotiated_rate = param.first().copied();
            (Status::OK, Vec::new())
        }
        CommandCode::InitDeviceNumber => {
            if let [a, b] = param {
                state.device_number = [*a, *b];
            }
            (Status::OK, Vec::new())
        }
        CommandCode::GetDeviceNumber => (Status::OK, state.device_number.to_vec()),
        CommandCode::GetModel => (Status::OK, MODEL.to_vec()),
        CommandCode::Beep => {
            state.beeps.push(param.first().copied().unwrap_or(0));
            (Status::OK, Vec::new())
        }
        CommandCode::Light => {
            state
                .lights
                .push(LedState::from_u8(param.first().copied().unwrap_or(0)));
            (Status::OK, Vec::new())
        }
        CommandCode::InitType | CommandCode::Antenna | CommandCode::Halt | CommandCode::Auth2 => {
            (Status::OK, Vec::new())
        }
        CommandCode::Request => match state.card {
            Some(_) => (Status::OK, Vec::new()),
            None => (Status::NO_CARD, Vec::new()),
        },
        CommandCode::Anticoll => match &state.card {
            Some(payload) => (Status::OK, payload.clone()),
            None => (Status::NO_CARD, Vec::new()),
        },
        CommandCode::Select => match state.card {
            Some(_) => (Status::OK, vec![CAPACITY_1K]),
            None => (Status::NO_CARD, Vec::new()),
        },
        CommandCode::ReadBlock => {
            let block = param.first().copied().unwrap_or(0);
            let data = state.blocks.get(&block).copied().unwrap_or_default();
            (Status::OK, data.to_vec())
        }
        CommandCode::WriteBlock => match param {
            [block, data @ ..] if data.len() == 16 => {
                let mut stored = [0u8; 16];
                stored.copy_from_slice(data);
                state.blocks.insert(*block, stored);
                (Status::OK, Vec::new())
            }
            _ => (Status(0x01), Vec::new()),
        },
    };

    // Oversized data only happens when a test presents an absurd payload;
    // answer with a bare error status rather than a malformed frame.
    Response::new(request.device, request.command, status, data).unwrap_or(Response {
        device: DeviceAddress::ANY,
        command: request.command,
        status: Status(0x01),
        data: bytes::Bytes::new(),
    })
}
