use crate::{Result, error::Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response status byte attached to every SL500 reply.
///
/// `0x00` is success; every other value is a device-defined error code that
/// is surfaced to the caller verbatim. `0x14` from the card-request
/// operation means "no card in field" and is a normal polling outcome, not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status(pub u8);

impl Status {
    pub const OK: Status = Status(crate::constants::STATUS_OK);
    pub const NO_CARD: Status = Status(crate::constants::STATUS_NO_CARD);

    /// `true` for the success status `0x00`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.0 == crate::constants::STATUS_OK
    }

    /// `true` for the "no card in field" status `0x14`.
    #[must_use]
    pub fn is_no_card(&self) -> bool {
        self.0 == crate::constants::STATUS_NO_CARD
    }

    /// Raw status byte.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Convert a success status into `Ok(())` and anything else into
    /// [`Error::Device`].
    pub fn ok(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(Error::Device(self))
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Two-byte reader address carried in every frame.
///
/// `00 00` addresses any reader on the line; with a single reader bound per
/// process this is the only address the bridge ever uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress([u8; 2]);

impl DeviceAddress {
    /// The broadcast address `00 00`.
    pub const ANY: DeviceAddress = DeviceAddress([0x00, 0x00]);

    #[must_use]
    pub fn new(bytes: [u8; 2]) -> Self {
        DeviceAddress(bytes)
    }

    /// On-wire byte order.
    #[must_use]
    pub fn as_wire(&self) -> [u8; 2] {
        self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02x}{:02x}", self.0[0], self.0[1])
    }
}

/// Card UID as reported by the anti-collision step.
///
/// The reader returns a variable-length UID; only the 4-byte case is
/// interpreted, assembled little-endian from the on-wire byte order. Any
/// other length is treated as "no UID available" and reported as
/// [`CardUid::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardUid(u32);

impl CardUid {
    /// The absent UID. The poller treats this as "no card".
    pub const NONE: CardUid = CardUid(0);

    #[must_use]
    pub fn new(uid: u32) -> Self {
        CardUid(uid)
    }

    /// Assemble a UID from an anti-collision response payload.
    ///
    /// Exactly four bytes produce a little-endian UID; every other length
    /// yields [`CardUid::NONE`].
    #[must_use]
    pub fn from_anticoll(data: &[u8]) -> Self {
        match data {
            [a, b, c, d] => CardUid(u32::from_le_bytes([*a, *b, *c, *d])),
            _ => CardUid::NONE,
        }
    }

    /// `true` when no UID is present.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// On-wire little-endian byte order, as expected by `select`.
    #[must_use]
    pub fn to_wire(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

/// Displays as the decimal integer used by the `card_detected` line.
impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Line rates negotiable through `init_com`.
///
/// Rate codes follow the vendor protocol. 14400 and 28800 exist on the
/// device but have no matching host-side termios speed, so they are rejected
/// before any I/O is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaudRate {
    B4800,
    B9600,
    B14400,
    B19200,
    B28800,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    /// One-byte rate code carried by the `init_com` parameter.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            BaudRate::B4800 => 0x00,
            BaudRate::B9600 => 0x01,
            BaudRate::B14400 => 0x02,
            BaudRate::B19200 => 0x03,
            BaudRate::B28800 => 0x04,
            BaudRate::B38400 => 0x05,
            BaudRate::B57600 => 0x06,
            BaudRate::B115200 => 0x07,
        }
    }

    /// Bits per second.
    #[must_use]
    pub fn bps(&self) -> u32 {
        match self {
            BaudRate::B4800 => 4_800,
            BaudRate::B9600 => 9_600,
            BaudRate::B14400 => 14_400,
            BaudRate::B19200 => 19_200,
            BaudRate::B28800 => 28_800,
            BaudRate::B38400 => 38_400,
            BaudRate::B57600 => 57_600,
            BaudRate::B115200 => 115_200,
        }
    }

    /// `false` for the rates the host side cannot configure.
    #[must_use]
    pub fn host_supported(&self) -> bool {
        !matches!(self, BaudRate::B14400 | BaudRate::B28800)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} baud", self.bps())
    }
}

/// LED bitmask for the `light` operation.
///
/// Red and green may be combined; the vendor documents the combination as
/// "yellow", which is optimistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedState(u8);

impl LedState {
    pub const OFF: LedState = LedState(0x00);
    pub const RED: LedState = LedState(0x01);
    pub const GREEN: LedState = LedState(0x02);
    pub const BOTH: LedState = LedState(0x03);

    /// Raw bitmask byte.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Reconstruct a mask from its wire byte. Bits above the two LED bits
    /// are ignored.
    #[must_use]
    pub fn from_u8(raw: u8) -> Self {
        LedState(raw & 0x03)
    }
}

impl std::ops::BitOr for LedState {
    type Output = LedState;

    fn bitor(self, rhs: LedState) -> LedState {
        LedState(self.0 | rhs.0)
    }
}

/// Card request mode for the `request` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestMode {
    /// `0x26`: cards not already halted.
    Std,
    /// `0x52`: all cards in the field.
    All,
}

impl RequestMode {
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        match self {
            RequestMode::Std => 0x26,
            RequestMode::All => 0x52,
        }
    }
}

/// Tag technology selected by `init_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    TypeA,
    TypeB,
    Iso15693,
}

impl CardType {
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        match self {
            CardType::TypeA => b'A',
            CardType::TypeB => b'B',
            CardType::Iso15693 => b'1',
        }
    }
}

/// MIFARE Classic key slot selector for `auth2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    A,
    B,
}

impl KeyType {
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        match self {
            KeyType::A => 0x60,
            KeyType::B => 0x61,
        }
    }
}

/// A card presentation observed by the poller.
///
/// Created when a non-zero UID is seen while a wait is outstanding and the
/// previous event has been acknowledged; consumed exactly once by the
/// control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEvent {
    /// UID reported by anti-collision.
    pub uid: CardUid,

    /// When the poller observed the card.
    pub detected_at: DateTime<Utc>,
}

impl CardEvent {
    #[must_use]
    pub fn now(uid: CardUid) -> Self {
        CardEvent {
            uid,
            detected_at: Utc::now(),
        }
    }
}

/// Control command from the network plane to the reader plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeCommand {
    /// Arm the poller and report the next presented card.
    WaitForCard,
}

/// Event from the reader plane back to the network plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A card was presented while a wait was outstanding.
    CardDetected(CardUid),
}
