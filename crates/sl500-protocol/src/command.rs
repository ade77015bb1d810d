//! The SL500 opcode table.
//!
//! Command codes are two bytes, `(sub, group)`, with group `01` for device
//! control and group `02` for card operations. The set below is the complete
//! table the bridge uses; the reader echoes the code back in its response.

use sl500_core::{Error, Result};
use std::fmt;

/// Command code group for device control operations.
pub const GROUP_DEVICE: u8 = 0x01;

/// Command code group for card operations.
pub const GROUP_CARD: u8 = 0x02;

/// A recognised SL500 command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    /// Negotiate the serial line rate.
    InitCom,
    /// Assign the reader's device number.
    InitDeviceNumber,
    /// Read back the reader's device number.
    GetDeviceNumber,
    /// Read the model string.
    GetModel,
    /// Sound the beeper.
    Beep,
    /// Drive the status LEDs.
    Light,
    /// Select the tag technology.
    InitType,
    /// Switch the antenna on or off.
    Antenna,
    /// Request cards in the field.
    Request,
    /// Run anti-collision and obtain a UID.
    Anticoll,
    /// Select a card by UID.
    Select,
    /// Halt the selected card.
    Halt,
    /// MIFARE Classic authentication (key download variant).
    Auth2,
    /// Read a 16-byte block.
    ReadBlock,
    /// Write a 16-byte block.
    WriteBlock,
}

impl CommandCode {
    /// On-wire `(sub, group)` byte pair.
    #[must_use]
    pub fn as_wire(&self) -> [u8; 2] {
        match self {
            CommandCode::InitCom => [0x01, GROUP_DEVICE],
            CommandCode::InitDeviceNumber => [0x02, GROUP_DEVICE],
            CommandCode::GetDeviceNumber => [0x03, GROUP_DEVICE],
            CommandCode::GetModel => [0x04, GROUP_DEVICE],
            CommandCode::Beep => [0x06, GROUP_DEVICE],
            CommandCode::Light => [0x07, GROUP_DEVICE],
            CommandCode::InitType => [0x08, GROUP_DEVICE],
            CommandCode::Antenna => [0x0C, GROUP_DEVICE],
            CommandCode::Request => [0x01, GROUP_CARD],
            CommandCode::Anticoll => [0x02, GROUP_CARD],
            CommandCode::Select => [0x03, GROUP_CARD],
            CommandCode::Halt => [0x04, GROUP_CARD],
            CommandCode::Auth2 => [0x07, GROUP_CARD],
            CommandCode::ReadBlock => [0x08, GROUP_CARD],
            CommandCode::WriteBlock => [0x09, GROUP_CARD],
        }
    }

    /// Parse an on-wire byte pair.
    ///
    /// # Errors
    /// Returns [`Error::UnknownCommandCode`] for codes outside the table.
    pub fn from_wire(wire: [u8; 2]) -> Result<Self> {
        let code = match wire {
            [0x01, GROUP_DEVICE] => CommandCode::InitCom,
            [0x02, GROUP_DEVICE] => CommandCode::InitDeviceNumber,
            [0x03, GROUP_DEVICE] => CommandCode::GetDeviceNumber,
            [0x04, GROUP_DEVICE] => CommandCode::GetModel,
            [0x06, GROUP_DEVICE] => CommandCode::Beep,
            [0x07, GROUP_DEVICE] => CommandCode::Light,
            [0x08, GROUP_DEVICE] => CommandCode::InitType,
            [0x0C, GROUP_DEVICE] => CommandCode::Antenna,
            [0x01, GROUP_CARD] => CommandCode::Request,
            [0x02, GROUP_CARD] => CommandCode::Anticoll,
            [0x03, GROUP_CARD] => CommandCode::Select,
            [0x04, GROUP_CARD] => CommandCode::Halt,
            [0x07, GROUP_CARD] => CommandCode::Auth2,
            [0x08, GROUP_CARD] => CommandCode::ReadBlock,
            [0x09, GROUP_CARD] => CommandCode::WriteBlock,
            [sub, group] => return Err(Error::UnknownCommandCode(sub, group)),
        };
        Ok(code)
    }

    /// All recognised codes, in table order.
    #[must_use]
    pub fn all() -> &'static [CommandCode] {
        &[
            CommandCode::InitCom,
            CommandCode::InitDeviceNumber,
            CommandCode::GetDeviceNumber,
            CommandCode::GetModel,
            CommandCode::Beep,
            CommandCode::Light,
            CommandCode::InitType,
            CommandCode::Antenna,
            CommandCode::Request,
            CommandCode::Anticoll,
            CommandCode::Select,
            CommandCode::Halt,
            CommandCode::Auth2,
            CommandCode::ReadBlock,
            CommandCode::WriteBlock,
        ]
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [sub, group] = self.as_wire();
        write!(f, "{:?}({:02x} {:02x})", self, sub, group)
    }
}
