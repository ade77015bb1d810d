//! Serial endpoint access.
//!
//! The bridge needs exactly one capability from the platform: a byte-stream
//! endpoint at a given line rate. [`open_endpoint`] provides it as a
//! [`SerialStream`] in raw 8N1 mode, usable with
//! `tokio_util::codec::Framed`. [`LineControl`] is the seam through which
//! `init_com` renegotiates the rate after the reader acknowledges the new
//! speed; in-memory test endpoints implement it as a no-op.

use sl500_core::{Error, Result};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPort, SerialStream, StopBits};

/// Reconfigure the line rate of an already-open endpoint.
pub trait LineControl {
    /// Switch the endpoint to `bps` bits per second.
    fn set_line_rate(&mut self, bps: u32) -> Result<()>;
}

impl LineControl for SerialStream {
    fn set_line_rate(&mut self, bps: u32) -> Result<()> {
        self.set_baud_rate(bps)
            .map_err(|e| Error::Serial(e.to_string()))
    }
}

/// Open the reader's serial device in raw mode: 8 data bits, no parity,
/// one stop bit, no flow control.
pub fn open_endpoint(path: &str, bps: u32) -> Result<SerialStream> {
    let builder = tokio_serial::new(path, bps)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None);

    SerialStream::open(&builder).map_err(|e| Error::Serial(e.to_string()))
}
