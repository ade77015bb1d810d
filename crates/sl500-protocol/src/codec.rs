//! Tokio codecs for SL500 frame streams.
//!
//! [`Sl500Codec`] is the host side: it encodes [`Request`] frames and
//! decodes [`Response`] frames, for use with `tokio_util::codec::Framed`
//! over the serial endpoint. [`Sl500DeviceCodec`] is the mirror image and
//! exists for device emulators and tests.
//!
//! # Decoding rules
//!
//! The decoder consumes nothing until a full frame is available, so partial
//! serial reads simply return `Ok(None)`. Deviations that are fatal for the
//! in-flight frame:
//!
//! - an unexpected head byte
//! - a non-zero length high byte
//! - a payload `0xAA` not followed by its `0x00` stuffing byte
//!
//! A verification mismatch is logged as a warning and the frame is still
//! delivered, matching the reader's observed field behavior of occasionally
//! producing bad checksums on otherwise valid frames.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::command::CommandCode;
use crate::frame::{Request, Response, verification};
use sl500_core::constants::{
    HEAD_FIRST, HEAD_SECOND, LEN_HIGH, REQUEST_OVERHEAD, RESPONSE_OVERHEAD, STUFFING_BYTE,
};
use sl500_core::{DeviceAddress, Error, Result, Status};

/// Outcome of one attempt to lift a frame body out of the buffer.
struct RawFrame {
    /// Unstuffed body: device id, command code, payload, verification.
    body: Vec<u8>,

    /// Wire bytes consumed, stuffing included.
    consumed: usize,
}

/// Try to read one complete frame starting at the beginning of `src`.
///
/// `min_len` is the smallest declared length the caller's frame kind
/// allows; it also locates the stuffed region of the body (requests stuff
/// the parameter, responses stuff the data region; device id, command
/// code, status and verification are never stuffed).
///
/// Returns `Ok(None)` while the frame is incomplete. Nothing is consumed
/// from `src` here; the callers advance it once a frame parses.
fn take_frame(src: &BytesMut, min_len: usize) -> Result<Option<(u8, RawFrame)>> {
    let buf = src.as_ref();
    if buf.len() < 4 {
        return Ok(None);
    }

    if buf[0] != HEAD_FIRST || buf[1] != HEAD_SECOND {
        return Err(Error::framing(format!(
            "expected head aa bb, got {:02x} {:02x}",
            buf[0], buf[1]
        )));
    }
    let len = buf[2];
    if buf[3] != LEN_HIGH {
        return Err(Error::framing(format!(
            "reserved length high byte is {:02x}",
            buf[3]
        )));
    }
    if (len as usize) < min_len {
        return Err(Error::framing(format!("declared length {len} too short")));
    }

    // Data region within the unstuffed body: everything between the fixed
    // header fields and the trailing verification byte.
    let data_start = min_len - 1;
    let data_end = len as usize - 1;

    let mut body = Vec::with_capacity(len as usize);
    let mut pos = 4usize;
    while body.len() < len as usize {
        let Some(&byte) = buf.get(pos) else {
            return Ok(None);
        };
        pos += 1;

        let index = body.len();
        body.push(byte);

        // The reader escapes payload head bytes; a missing stuffing byte
        // means we are out of sync with the stream.
        if byte == HEAD_FIRST && (data_start..data_end).contains(&index) {
            match buf.get(pos) {
                None => return Ok(None),
                Some(&STUFFING_BYTE) => pos += 1,
                Some(&other) => {
                    return Err(Error::framing(format!(
                        "expected stuffing 00 after payload aa, got {other:02x}"
                    )));
                }
            }
        }
    }

    Ok(Some((len, RawFrame {
        body,
        consumed: pos,
    })))
}

/// Verify the trailing XOR byte, warning on mismatch.
fn check_verification(body: &[u8]) {
    let received = body[body.len() - 1];
    let computed = verification(&[&body[..body.len() - 1]]);
    if received != computed {
        warn!("frame verification should be {computed:02x} but was {received:02x}");
    }
}

/// Host-side codec: encodes requests, decodes responses.
#[derive(Debug, Default)]
pub struct Sl500Codec;

impl Sl500Codec {
    #[must_use]
    pub fn new() -> Self {
        Sl500Codec
    }
}

impl Encoder<Request> for Sl500Codec {
    type Error = Error;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&item.to_wire());
        Ok(())
    }
}

impl Decoder for Sl500Codec {
    type Item = Response;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Response>> {
        let Some((len, raw)) = take_frame(src, RESPONSE_OVERHEAD)? else {
            return Ok(None);
        };
        check_verification(&raw.body);

        let body = &raw.body;
        let device = DeviceAddress::new([body[0], body[1]]);
        let command = CommandCode::from_wire([body[2], body[3]])?;
        let status = Status(body[4]);
        let data = body[5..len as usize - 1].to_vec();

        src.advance(raw.consumed);
        Ok(Some(Response {
            device,
            command,
            status,
            data: data.into(),
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Response>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(Error::framing("endpoint closed mid-frame")),
        }
    }
}

/// Device-side codec: decodes requests, encodes responses.
///
/// The bridge never uses this against real hardware; it drives the mock
/// reader and the protocol test suite.
#[derive(Debug, Default)]
pub struct Sl500DeviceCodec;

impl Sl500DeviceCodec {
    #[must_use]
    pub fn new() -> Self {
        Sl500DeviceCodec
    }
}

impl Encoder<Response> for Sl500DeviceCodec {
    type Error = Error;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&item.to_wire());
        Ok(())
    }
}

impl Decoder for Sl500DeviceCodec {
    type Item = Request;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>> {
        let Some((len, raw)) = take_frame(src, REQUEST_OVERHEAD)? else {
            return Ok(None);
        };
        check_verification(&raw.body);

        let body = &raw.body;
        let device = DeviceAddress::new([body[0], body[1]]);
        let command = CommandCode::from_wire([body[2], body[3]])?;
        let param = body[4..len as usize - 1].to_vec();

        src.advance(raw.consumed);
        Ok(Some(Request {
            device,
            command,
            param: param.into(),
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Request>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(Error::framing("endpoint closed mid-frame")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut Sl500Codec, bytes: &[u8]) -> Result<Option<Response>> {
        let mut buf = BytesMut::from(bytes);
        codec.decode(&mut buf)
    }

    #[test]
    fn decodes_a_complete_response() {
        let mut codec = Sl500Codec::new();
        let wire = [
            0xAA, 0xBB, 0x0A, 0x00, // head + length
            0x00, 0x00, 0x02, 0x02, // device + anticoll
            0x00, // status
            0xDE, 0xAD, 0xBE, 0xEF, // uid
            0xDE ^ 0xAD ^ 0xBE ^ 0xEF, // verification (cmd bytes cancel)
        ];
        let resp = decode_all(&mut codec, &wire).unwrap().unwrap();
        assert_eq!(resp.command, CommandCode::Anticoll);
        assert!(resp.status.is_success());
        assert_eq!(resp.data.as_ref(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn partial_frames_consume_nothing() {
        let mut codec = Sl500Codec::new();
        let full = Response::new(
            DeviceAddress::ANY,
            CommandCode::GetModel,
            Status::OK,
            b"SL500".to_vec(),
        )
        .unwrap()
        .to_wire();

        for cut in 0..full.len() {
            let mut buf = BytesMut::from(&full[..cut]);
            let before = buf.len();
            assert!(codec.decode(&mut buf).unwrap().is_none(), "cut at {cut}");
            assert_eq!(buf.len(), before, "cut at {cut}");
        }
    }

    #[test]
    fn bad_head_is_fatal() {
        let mut codec = Sl500Codec::new();
        let err = decode_all(&mut codec, &[0xAA, 0xBC, 0x05, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Framing(_)));
    }

    #[test]
    fn nonzero_length_high_byte_is_fatal() {
        let mut codec = Sl500Codec::new();
        let err = decode_all(&mut codec, &[0xAA, 0xBB, 0x06, 0x01]).unwrap_err();
        assert!(matches!(err, Error::Framing(_)));
    }

    #[test]
    fn missing_stuffing_byte_is_fatal() {
        let mut codec = Sl500Codec::new();
        // Anticoll response whose data starts with AA, followed by a byte
        // that is not the stuffing 00.
        let wire = [
            0xAA, 0xBB, 0x07, 0x00, 0x00, 0x00, 0x02, 0x02, 0x00, 0xAA, 0x55,
        ];
        let err = decode_all(&mut codec, &wire).unwrap_err();
        assert!(matches!(err, Error::Framing(_)));
    }

    #[test]
    fn stuffed_data_is_stripped() {
        let mut codec = Sl500Codec::new();
        let resp = Response::new(
            DeviceAddress::ANY,
            CommandCode::ReadBlock,
            Status::OK,
            vec![0xAA, 0xAA, 0x01],
        )
        .unwrap();
        let mut buf = BytesMut::from(resp.to_wire().as_ref());
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.data.as_ref(), &[0xAA, 0xAA, 0x01]);
        assert!(buf.is_empty());
    }

    #[test]
    fn verification_mismatch_still_delivers() {
        let mut codec = Sl500Codec::new();
        let mut wire = Response::new(
            DeviceAddress::ANY,
            CommandCode::Beep,
            Status::OK,
            Vec::new(),
        )
        .unwrap()
        .to_wire()
        .to_vec();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;

        let resp = decode_all(&mut codec, &wire).unwrap().unwrap();
        assert_eq!(resp.command, CommandCode::Beep);
    }

    #[test]
    fn two_frames_in_one_read() {
        let mut codec = Sl500Codec::new();
        let a = Response::new(DeviceAddress::ANY, CommandCode::Request, Status::NO_CARD, Vec::new())
            .unwrap()
            .to_wire();
        let b = Response::new(
            DeviceAddress::ANY,
            CommandCode::Anticoll,
            Status::OK,
            vec![1, 2, 3, 4],
        )
        .unwrap()
        .to_wire();

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&a);
        buf.extend_from_slice(&b);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert!(first.status.is_no_card());
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.data.as_ref(), &[1, 2, 3, 4]);
        assert!(buf.is_empty());
    }

    #[test]
    fn eof_mid_frame_is_fatal() {
        let mut codec = Sl500Codec::new();
        let mut buf = BytesMut::from(&[0xAA, 0xBB, 0x05][..]);
        let err = codec.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, Error::Framing(_)));
    }

    #[test]
    fn device_codec_round_trips_requests() {
        let mut host = Sl500Codec::new();
        let mut device = Sl500DeviceCodec::new();

        let req = Request::new(
            DeviceAddress::ANY,
            CommandCode::Auth2,
            vec![0x60, 0x07, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
        )
        .unwrap();

        let mut wire = BytesMut::new();
        host.encode(req.clone(), &mut wire).unwrap();
        let decoded = device.decode(&mut wire).unwrap().unwrap();
        assert_eq!(decoded, req);
        assert!(wire.is_empty());
    }
}
