//! Typed SL500 operations.
//!
//! [`Sl500`] wraps a framed endpoint and exposes one method per entry of the
//! reader's command table. Every operation performs exactly one
//! request/response exchange and returns the status byte from the reply;
//! non-zero statuses are device outcomes for the caller to interpret, not
//! transport errors.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use sl500_core::{
    BaudRate, CardType, CardUid, DeviceAddress, Error, KeyType, LedState, RequestMode, Result,
    Status,
};
use sl500_protocol::{CommandCode, Request, Response, Sl500Codec};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::trace;

use crate::serial::LineControl;

/// A MIFARE Classic block is always 16 bytes.
pub const BLOCK_LEN: usize = 16;

/// An SL500-family reader behind a byte-stream endpoint.
///
/// The endpoint is owned exclusively; one exchange is in flight at a time.
/// All operations address the broadcast device id `00 00` since exactly one
/// reader is bound per process.
#[derive(Debug)]
pub struct Sl500<T> {
    framed: Framed<T, Sl500Codec>,
    device: DeviceAddress,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Sl500<T> {
    /// Wrap an endpoint. No traffic is exchanged until the first operation.
    pub fn new(endpoint: T) -> Self {
        Sl500 {
            framed: Framed::new(endpoint, Sl500Codec::new()),
            device: DeviceAddress::ANY,
        }
    }

    /// Consume the wrapper and return the endpoint.
    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }

    /// One request/response exchange.
    async fn exchange(&mut self, command: CommandCode, param: Vec<u8>) -> Result<Response> {
        let request = Request::new(self.device, command, param)?;
        trace!(%request, "sending");
        self.framed.send(request).await?;

        match self.framed.next().await {
            Some(response) => {
                let response = response?;
                trace!(%response, "received");
                Ok(response)
            }
            None => Err(Error::EndpointClosed),
        }
    }

    /// Negotiate a new line rate (`init_com`, code `01 01`).
    ///
    /// Rates without a host-side speed are rejected before any I/O. On a
    /// success status the endpoint itself is switched to the new rate before
    /// the next frame is sent.
    pub async fn init_com(&mut self, rate: BaudRate) -> Result<Status>
    where
        T: LineControl,
    {
        if !rate.host_supported() {
            return Err(Error::UnsupportedBaud(rate.bps()));
        }

        let response = self.exchange(CommandCode::InitCom, vec![rate.code()]).await?;
        if response.status.is_success() {
            self.framed.get_mut().set_line_rate(rate.bps())?;
        }
        Ok(response.status)
    }

    /// Assign the reader's device number (`init_device_number`, `02 01`).
    pub async fn init_device_number(&mut self, number: [u8; 2]) -> Result<Status> {
        let response = self
            .exchange(CommandCode::InitDeviceNumber, number.to_vec())
            .await?;
        Ok(response.status)
    }

    /// Read back the reader's device number (`get_device_number`, `03 01`).
    pub async fn get_device_number(&mut self) -> Result<(Status, Option<[u8; 2]>)> {
        let response = self.exchange(CommandCode::GetDeviceNumber, Vec::new()).await?;
        let number = match response.data.as_ref() {
            [a, b] => Some([*a, *b]),
            _ => None,
        };
        Ok((response.status, number))
    }

    /// Read the model string (`get_model`, `04 01`). The data is ASCII.
    pub async fn get_model(&mut self) -> Result<(Status, Bytes)> {
        let response = self.exchange(CommandCode::GetModel, Vec::new()).await?;
        Ok((response.status, response.data))
    }

    /// Sound the beeper for `duration` x 10 ms (`beep`, `06 01`).
    pub async fn beep(&mut self, duration: u8) -> Result<Status> {
        let response = self.exchange(CommandCode::Beep, vec![duration]).await?;
        Ok(response.status)
    }

    /// Drive the status LEDs (`light`, `07 01`).
    pub async fn light(&mut self, led: LedState) -> Result<Status> {
        let response = self.exchange(CommandCode::Light, vec![led.as_u8()]).await?;
        Ok(response.status)
    }

    /// Select the tag technology (`init_type`, `08 01`).
    pub async fn init_type(&mut self, card_type: CardType) -> Result<Status> {
        let response = self
            .exchange(CommandCode::InitType, vec![card_type.as_u8()])
            .await?;
        Ok(response.status)
    }

    /// Switch the antenna on or off (`antenna`, `0C 01`).
    pub async fn antenna(&mut self, on: bool) -> Result<Status> {
        let response = self.exchange(CommandCode::Antenna, vec![on as u8]).await?;
        Ok(response.status)
    }

    /// Request cards in the field (`request`, `01 02`). The ATQA bytes in
    /// the reply are not interpreted; status `0x14` means no card.
    pub async fn request(&mut self, mode: RequestMode) -> Result<Status> {
        let response = self.exchange(CommandCode::Request, vec![mode.as_u8()]).await?;
        Ok(response.status)
    }

    /// Run anti-collision (`anticoll`, `02 02`).
    ///
    /// A success status with a 4-byte payload yields the UID assembled
    /// little-endian; any other payload length, or a non-zero status,
    /// yields [`CardUid::NONE`].
    pub async fn anticoll(&mut self) -> Result<(Status, CardUid)> {
        let response = self.exchange(CommandCode::Anticoll, Vec::new()).await?;
        let uid = if response.status.is_success() {
            CardUid::from_anticoll(&response.data)
        } else {
            CardUid::NONE
        };
        Ok((response.status, uid))
    }

    /// Select a card by UID (`select`, `03 02`). Returns the card's
    /// capacity byte when the reader provides one.
    pub async fn select(&mut self, uid: CardUid) -> Result<(Status, Option<u8>)> {
        let response = self
            .exchange(CommandCode::Select, uid.to_wire().to_vec())
            .await?;
        Ok((response.status, response.data.first().copied()))
    }

    /// Halt the selected card (`halt`, `04 02`).
    pub async fn halt(&mut self) -> Result<Status> {
        let response = self.exchange(CommandCode::Halt, Vec::new()).await?;
        Ok(response.status)
    }

    /// MIFARE Classic authentication with a downloaded key
    /// (`auth2`, `07 02`).
    pub async fn auth2(&mut self, key_type: KeyType, block: u8, key: [u8; 6]) -> Result<Status> {
        let mut param = Vec::with_capacity(8);
        param.push(key_type.as_u8());
        param.push(block);
        param.extend_from_slice(&key);

        let response = self.exchange(CommandCode::Auth2, param).await?;
        Ok(response.status)
    }

    /// Read a 16-byte block (`read_block`, `08 02`).
    pub async fn read_block(&mut self, block: u8) -> Result<(Status, Bytes)> {
        let response = self.exchange(CommandCode::ReadBlock, vec![block]).await?;
        Ok((response.status, response.data))
    }

    /// Write a 16-byte block (`write_block`, `09 02`).
    pub async fn write_block(&mut self, block: u8, data: [u8; BLOCK_LEN]) -> Result<Status> {
        let mut param = Vec::with_capacity(1 + BLOCK_LEN);
        param.push(block);
        param.extend_from_slice(&data);

        let response = self.exchange(CommandCode::WriteBlock, param).await?;
        Ok(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockReader;

    #[tokio::test]
    async fn anticoll_reports_four_byte_uid() {
        let (endpoint, handle) = MockReader::spawn();
        let mut reader = Sl500::new(endpoint);

        handle.present_card(vec![0x11, 0x22, 0x33, 0x44]);
        let (status, uid) = reader.anticoll().await.unwrap();
        assert!(status.is_success());
        assert_eq!(uid.as_u32(), 0x4433_2211);
    }

    #[tokio::test]
    async fn anticoll_odd_length_uid_is_none() {
        let (endpoint, handle) = MockReader::spawn();
        let mut reader = Sl500::new(endpoint);

        handle.present_card(vec![0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);
        let (status, uid) = reader.anticoll().await.unwrap();
        assert!(status.is_success());
        assert!(uid.is_none());
    }

    #[tokio::test]
    async fn anticoll_without_card_is_no_card() {
        let (endpoint, _handle) = MockReader::spawn();
        let mut reader = Sl500::new(endpoint);

        let (status, uid) = reader.anticoll().await.unwrap();
        assert!(status.is_no_card());
        assert!(uid.is_none());
    }

    #[tokio::test]
    async fn request_reflects_field_state() {
        let (endpoint, handle) = MockReader::spawn();
        let mut reader = Sl500::new(endpoint);

        assert!(reader.request(RequestMode::All).await.unwrap().is_no_card());
        handle.present_card(vec![1, 2, 3, 4]);
        assert!(reader.request(RequestMode::All).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn light_and_beep_are_recorded() {
        let (endpoint, handle) = MockReader::spawn();
        let mut reader = Sl500::new(endpoint);

        reader.light(LedState::GREEN).await.unwrap();
        reader.light(LedState::OFF).await.unwrap();
        reader.beep(10).await.unwrap();

        assert_eq!(handle.lights(), vec![LedState::GREEN, LedState::OFF]);
        assert_eq!(handle.beeps(), vec![10]);
    }

    #[tokio::test]
    async fn init_com_renegotiates_on_success() {
        let (endpoint, handle) = MockReader::spawn();
        let mut reader = Sl500::new(endpoint);

        let status = reader.init_com(BaudRate::B115200).await.unwrap();
        assert!(status.is_success());
        // The mock saw the new rate code and the endpoint was switched.
        assert_eq!(handle.negotiated_rate(), Some(0x07));
        assert_eq!(reader.into_inner().line_rate(), 115_200);
    }

    #[tokio::test]
    async fn init_com_rejects_host_unsupported_rates() {
        let (endpoint, handle) = MockReader::spawn();
        let mut reader = Sl500::new(endpoint);

        let err = reader.init_com(BaudRate::B14400).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedBaud(14_400)));
        // Rejected before any I/O reached the device.
        assert_eq!(handle.negotiated_rate(), None);
    }

    #[tokio::test]
    async fn block_read_write_round_trip() {
        let (endpoint, _handle) = MockReader::spawn();
        let mut reader = Sl500::new(endpoint);

        let payload = *b"sixteen byte blk";
        reader
            .auth2(KeyType::A, 0x07, [0xFF; 6])
            .await
            .unwrap()
            .ok()
            .unwrap();
        assert!(reader.write_block(0x04, payload).await.unwrap().is_success());

        let (status, data) = reader.read_block(0x04).await.unwrap();
        assert!(status.is_success());
        assert_eq!(data.as_ref(), &payload);
    }

    #[tokio::test]
    async fn select_returns_capacity() {
        let (endpoint, handle) = MockReader::spawn();
        let mut reader = Sl500::new(endpoint);

        handle.present_card(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let (_, uid) = reader.anticoll().await.unwrap();
        let (status, capacity) = reader.select(uid).await.unwrap();
        assert!(status.is_success());
        assert_eq!(capacity, Some(0x08));
    }

    #[tokio::test]
    async fn get_model_returns_ascii() {
        let (endpoint, _handle) = MockReader::spawn();
        let mut reader = Sl500::new(endpoint);

        let (status, model) = reader.get_model().await.unwrap();
        assert!(status.is_success());
        assert_eq!(model.as_ref(), b"SL500-USB");
    }
}
