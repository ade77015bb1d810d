//! Wire protocol for the SL500 family of 13.56 MHz RFID readers.
//!
//! The reader speaks a framed binary request/response protocol over a serial
//! line. This crate provides the byte-exact codec for that protocol:
//!
//! - [`Request`] / [`Response`] - typed frames
//! - [`CommandCode`] - the fixed opcode table
//! - [`Sl500Codec`] - host-side `tokio_util` codec (encode requests, decode
//!   responses)
//! - [`Sl500DeviceCodec`] - the mirror image, used by device emulators and
//!   protocol tests
//!
//! # Wire format
//!
//! ```text
//! request:  AA BB LEN_LO 00 DEV[2] CMD[2] PARAM[..] VER     LEN = 5 + |PARAM|
//! response: AA BB LEN_LO 00 DEV[2] CMD[2] STATUS DATA[..] VER   |DATA| = LEN - 6
//! ```
//!
//! `VER` is the XOR of every unstuffed byte from the device id through the
//! last payload byte. A payload byte equal to `0xAA` is followed by a `0x00`
//! stuffing byte on the wire; the stuffing byte participates in neither the
//! length nor the verification.

pub mod codec;
pub mod command;
pub mod frame;

pub use codec::{Sl500Codec, Sl500DeviceCodec};
pub use command::CommandCode;
pub use frame::{Request, Response};
