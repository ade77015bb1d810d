//! Protocol-level constants for the SL500 serial protocol and the bridge.
//!
//! The SL500 family speaks a framed binary protocol over the serial line:
//!
//! ```text
//! AA BB  LEN_LO 00  DEV_ID[2]  CMD_CODE[2]  PAYLOAD...  VER
//! ```
//!
//! Where:
//! - `AA BB` - frame head, never allowed to reappear unescaped in the payload
//! - `LEN_LO 00` - 16-bit little-endian length; the high byte is reserved
//! - `VER` - XOR of every unstuffed byte from the device id onwards
//!
//! Payload bytes equal to [`HEAD_FIRST`] are followed by a stuffing `0x00`
//! on the wire so a receiver can never resynchronise on a false head. The
//! stuffing byte is excluded from both the length and the verification.

// ============================================================================
// Frame layout
// ============================================================================

/// First byte of the frame head.
pub const HEAD_FIRST: u8 = 0xAA;

/// Second byte of the frame head.
pub const HEAD_SECOND: u8 = 0xBB;

/// Stuffing byte inserted after a payload [`HEAD_FIRST`].
pub const STUFFING_BYTE: u8 = 0x00;

/// Reserved high byte of the length field. Always zero on the wire.
pub const LEN_HIGH: u8 = 0x00;

/// Bytes of the declared length that are not response data:
/// device id (2) + command code (2) + status (1) + verification (1).
pub const RESPONSE_OVERHEAD: usize = 6;

/// Request length base: device id (2) + command code (2) + verification (1).
/// `LEN = REQUEST_OVERHEAD + param_len`.
pub const REQUEST_OVERHEAD: usize = 5;

/// Largest request parameter the one-byte length field can express.
pub const MAX_PARAM_LEN: usize = 255 - REQUEST_OVERHEAD;

/// Largest response data the one-byte length field can express. One less
/// than [`MAX_PARAM_LEN`]: responses spend an extra length byte on the
/// status.
pub const MAX_DATA_LEN: usize = 255 - RESPONSE_OVERHEAD;

// ============================================================================
// Status bytes
// ============================================================================

/// Operation succeeded.
pub const STATUS_OK: u8 = 0x00;

/// No card in the RF field; the normal outcome of an idle `request` poll.
pub const STATUS_NO_CARD: u8 = 0x14;

// ============================================================================
// Bridge timing
// ============================================================================

/// Poller tick period in milliseconds.
pub const POLL_TICK_MS: u64 = 100;

/// A request/anti-collision pair is issued every this many ticks.
pub const POLL_DIVISOR: u32 = 2;

/// Heartbeat LED cadence: green on every this many ticks, off two later.
pub const HEARTBEAT_DIVISOR: u32 = 20;

/// Tick offset at which the heartbeat LED is switched off again.
pub const HEARTBEAT_OFF_OFFSET: u32 = 2;

/// Number of green flashes when a card is detected.
pub const FLASH_BURST_COUNT: u32 = 5;

/// Duration of a single detection flash in milliseconds.
pub const FLASH_PULSE_MS: u64 = 50;

/// Beep length on detection, in units of 10 ms.
pub const DETECT_BEEP_DURATION: u8 = 10;

// ============================================================================
// Network control plane
// ============================================================================

/// TCP port of the line-oriented control protocol.
pub const CONTROL_PORT: u16 = 3333;

/// Protocol version advertised in the `server_protocol` reply.
pub const SERVER_PROTOCOL_VERSION: &str = "1.0";

/// Command line buffer capacity; overflow silently resets the buffer.
pub const LINE_BUFFER_CAP: usize = 50;

/// Longest accepted `client_protocol` version token.
pub const MAX_CLIENT_PROTOCOL_LEN: usize = 9;

// ============================================================================
// Serial endpoint defaults
// ============================================================================

/// Default serial device path.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/ttyUSB0";

/// Initial line rate before any `init_com` renegotiation.
pub const DEFAULT_LINE_RATE: u32 = 19_200;
