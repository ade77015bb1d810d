use crate::types::Status;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Wire codec errors
    #[error("framing error: {0}")]
    Framing(String),

    #[error("unknown command code {0:02x} {1:02x}")]
    UnknownCommandCode(u8, u8),

    #[error("parameter too long: {0} bytes")]
    ParamTooLong(usize),

    // Reader errors
    #[error("device reported status {0}")]
    Device(Status),

    #[error("baud rate {0} not supported by the host side")]
    UnsupportedBaud(u32),

    #[error("serial endpoint error: {0}")]
    Serial(String),

    #[error("serial endpoint closed")]
    EndpointClosed,

    // Bridge errors
    #[error("{0} channel closed")]
    ChannelClosed(&'static str),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a framing error from anything displayable.
    pub fn framing(msg: impl Into<String>) -> Self {
        Error::Framing(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
