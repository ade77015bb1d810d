//! Typed request and response frames.
//!
//! A [`Request`] carries a device address, a command code and an opaque
//! parameter; a [`Response`] additionally carries the one-byte status the
//! reader attaches to every reply. Conversion to wire bytes lives here;
//! stream decoding lives in [`crate::codec`].

use crate::command::CommandCode;
use bytes::{BufMut, Bytes, BytesMut};
use sl500_core::constants::{
    HEAD_FIRST, HEAD_SECOND, LEN_HIGH, MAX_DATA_LEN, MAX_PARAM_LEN, REQUEST_OVERHEAD,
    RESPONSE_OVERHEAD, STUFFING_BYTE,
};
use sl500_core::{DeviceAddress, Error, Result, Status};
use std::fmt;

/// XOR verification over the unstuffed frame body.
///
/// Covers device id, command code and payload; head, length field and
/// stuffing bytes are excluded.
#[must_use]
pub(crate) fn verification(parts: &[&[u8]]) -> u8 {
    parts
        .iter()
        .flat_map(|p| p.iter())
        .fold(0u8, |acc, &b| acc ^ b)
}

/// Append `payload` to `dst`, inserting a stuffing `0x00` after every
/// `0xAA` so the frame head cannot reappear inside a frame.
fn put_stuffed(dst: &mut BytesMut, payload: &[u8]) {
    for &b in payload {
        dst.put_u8(b);
        if b == HEAD_FIRST {
            dst.put_u8(STUFFING_BYTE);
        }
    }
}

/// A request frame bound for the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Target reader; `00 00` addresses any reader.
    pub device: DeviceAddress,

    /// Operation to perform.
    pub command: CommandCode,

    /// Unstuffed parameter bytes.
    pub param: Bytes,
}

impl Request {
    /// Build a request after validating the parameter length against the
    /// one-byte length field.
    ///
    /// # Errors
    /// Returns [`Error::ParamTooLong`] for parameters over 250 bytes.
    pub fn new(
        device: DeviceAddress,
        command: CommandCode,
        param: impl Into<Bytes>,
    ) -> Result<Self> {
        let param = param.into();
        if param.len() > MAX_PARAM_LEN {
            return Err(Error::ParamTooLong(param.len()));
        }
        Ok(Request {
            device,
            command,
            param,
        })
    }

    /// Declared length: device id, command code, parameter and verification.
    #[must_use]
    pub fn declared_len(&self) -> u8 {
        // Cannot exceed 255: `new` bounds the parameter.
        (REQUEST_OVERHEAD + self.param.len()) as u8
    }

    /// Serialise to wire bytes, stuffing included.
    #[must_use]
    pub fn to_wire(&self) -> Bytes {
        let dev = self.device.as_wire();
        let cmd = self.command.as_wire();
        let ver = verification(&[&dev, &cmd, &self.param]);

        let mut buf = BytesMut::with_capacity(5 + self.param.len() * 2 + 1);
        buf.put_u8(HEAD_FIRST);
        buf.put_u8(HEAD_SECOND);
        buf.put_u8(self.declared_len());
        buf.put_u8(LEN_HIGH);
        buf.put_slice(&dev);
        buf.put_slice(&cmd);
        put_stuffed(&mut buf, &self.param);
        buf.put_u8(ver);
        buf.freeze()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Request[dev={}, cmd={}, param={} bytes]",
            self.device,
            self.command,
            self.param.len()
        )
    }
}

/// A response frame received from the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Responding reader.
    pub device: DeviceAddress,

    /// Echo of the request's command code.
    pub command: CommandCode,

    /// Outcome byte; `0x00` is success.
    pub status: Status,

    /// Unstuffed response data.
    pub data: Bytes,
}

impl Response {
    /// Build a response after validating the data length.
    ///
    /// # Errors
    /// Returns [`Error::ParamTooLong`] for data over 249 bytes, the most
    /// the one-byte length field can declare alongside the status.
    pub fn new(
        device: DeviceAddress,
        command: CommandCode,
        status: Status,
        data: impl Into<Bytes>,
    ) -> Result<Self> {
        let data = data.into();
        if data.len() > MAX_DATA_LEN {
            return Err(Error::ParamTooLong(data.len()));
        }
        Ok(Response {
            device,
            command,
            status,
            data,
        })
    }

    /// Declared length: device id, command code, status, data and
    /// verification.
    #[must_use]
    pub fn declared_len(&self) -> u8 {
        // Cannot exceed 255: `new` bounds the data.
        (RESPONSE_OVERHEAD + self.data.len()) as u8
    }

    /// Serialise to wire bytes, stuffing included. Used by device-side
    /// emulators; the bridge itself only decodes responses.
    #[must_use]
    pub fn to_wire(&self) -> Bytes {
        let dev = self.device.as_wire();
        let cmd = self.command.as_wire();
        let status = [self.status.as_u8()];
        let ver = verification(&[&dev, &cmd, &status, &self.data]);

        let mut buf = BytesMut::with_capacity(6 + self.data.len() * 2 + 1);
        buf.put_u8(HEAD_FIRST);
        buf.put_u8(HEAD_SECOND);
        buf.put_u8(self.declared_len());
        buf.put_u8(LEN_HIGH);
        buf.put_slice(&dev);
        buf.put_slice(&cmd);
        buf.put_u8(self.status.as_u8());
        put_stuffed(&mut buf, &self.data);
        buf.put_u8(ver);
        buf.freeze()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Response[dev={}, cmd={}, status={}, data={} bytes]",
            self.device,
            self.command,
            self.status,
            self.data.len()
        )
    }
}
