//! Wire packets and command codes understood by the edge-device firmware.
//!
//! Every exchange on the radio is a fixed 5-byte packet:
//!
//! ```text
//! [sender, receiver, command, arg1, arg2]
//! ```
//!
//! An edge device acknowledges a packet by sending it back with sender and
//! receiver swapped and everything else unchanged. [`Packet::echo`] builds
//! that expected reply and [`Packet::is_confirmed_by`] checks a received one.
//!
//! # Example
//!
//! ```rust
//! use rf_switch_hub::packet::{Command, Packet};
//!
//! let packet = Packet::new(0, 3, Command::DigitalWrite, 2, 1);
//! assert_eq!(packet.to_bytes(), [0x00, 0x03, 0xA4, 0x02, 0x01]);
//! assert!(packet.is_confirmed_by(&[0x03, 0x00, 0xA4, 0x02, 0x01]));
//! assert!(!packet.is_confirmed_by(&[0x03, 0x00, 0xA4, 0x02, 0x00]));
//! ```

use core::fmt;

use crate::config::RadioConfig;
use crate::traits::PipeAddress;

/// Length of every packet on the wire.
pub const PACKET_LEN: usize = 5;

/// Reading pipe number used for device replies.
pub const REPLY_PIPE: u8 = 1;

/// Command codes, fixed by the edge-device firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Command {
    /// Echo `arg1` back; used to check the link.
    Echo,
    /// Set pin mode: `arg1` = pin, `arg2` = 0 input / 1 output.
    SetPinMode,
    /// Digital read of pin `arg1`.
    DigitalRead,
    /// Digital write: `arg1` = pin, `arg2` = 0 or 1.
    DigitalWrite,
    /// Analog read of pin `arg1`.
    AnalogRead,
    /// PWM write: `arg1` = pin, `arg2` = duty 0–255.
    AnalogWrite,
    /// Measure the board's supply voltage.
    ReadVoltage,
}

impl Command {
    /// All commands in code order.
    pub const ALL: [Command; 7] = [
        Command::Echo,
        Command::SetPinMode,
        Command::DigitalRead,
        Command::DigitalWrite,
        Command::AnalogRead,
        Command::AnalogWrite,
        Command::ReadVoltage,
    ];

    /// Wire code of this command.
    #[inline]
    pub const fn code(self) -> u8 {
        match self {
            Command::Echo => 0xA1,
            Command::SetPinMode => 0xA2,
            Command::DigitalRead => 0xA3,
            Command::DigitalWrite => 0xA4,
            Command::AnalogRead => 0xA5,
            Command::AnalogWrite => 0xA6,
            Command::ReadVoltage => 0xA7,
        }
    }

    /// Short name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Command::Echo => "echo",
            Command::SetPinMode => "set_pin_mode",
            Command::DigitalRead => "digital_read",
            Command::DigitalWrite => "digital_write",
            Command::AnalogRead => "analog_read",
            Command::AnalogWrite => "analog_write",
            Command::ReadVoltage => "read_voltage",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = UnknownCommand;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Command::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or(UnknownCommand(code))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A byte that is not a known command code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown command code {0:#04x}")]
pub struct UnknownCommand(pub u8);

/// One packet on the wire. Built per send and never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Packet {
    /// Id of the sending node (the hub is normally 0).
    pub sender: u8,
    /// Id of the addressed board.
    pub receiver: u8,
    /// What the board should do.
    pub command: Command,
    /// First argument, usually a pin id.
    pub arg1: u8,
    /// Second argument, usually a value.
    pub arg2: u8,
}

impl Packet {
    /// Build a packet.
    pub const fn new(sender: u8, receiver: u8, command: Command, arg1: u8, arg2: u8) -> Self {
        Self {
            sender,
            receiver,
            command,
            arg1,
            arg2,
        }
    }

    /// Encode as the 5 wire bytes.
    #[inline]
    pub const fn to_bytes(&self) -> [u8; PACKET_LEN] {
        [
            self.sender,
            self.receiver,
            self.command.code(),
            self.arg1,
            self.arg2,
        ]
    }

    /// Decode 5 wire bytes. Fails on an unknown command code.
    pub fn from_bytes(bytes: [u8; PACKET_LEN]) -> Result<Self, UnknownCommand> {
        Ok(Self {
            sender: bytes[0],
            receiver: bytes[1],
            command: Command::try_from(bytes[2])?,
            arg1: bytes[3],
            arg2: bytes[4],
        })
    }

    /// The reply an edge device sends to acknowledge this packet.
    pub const fn echo(&self) -> Self {
        Self {
            sender: self.receiver,
            receiver: self.sender,
            ..*self
        }
    }

    /// True iff `reply` is exactly this packet's echo.
    pub fn is_confirmed_by(&self, reply: &[u8]) -> bool {
        reply == self.echo().to_bytes()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_bytes(&self.to_bytes(), f)
    }
}

/// Render raw bytes the way packet logs show them: `0x0 0x3 0xa4 0x2 0x1`.
pub(crate) fn fmt_bytes(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{b:#x}")?;
    }
    Ok(())
}

/// Raw bytes with packet-style [`Display`](fmt::Display), for logging replies
/// that may not decode.
pub(crate) struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_bytes(self.0, f)
    }
}

/// Writing and reading pipe addresses for `receiver`.
///
/// Both are the configured base addresses offset by the receiver id, so the
/// mapping is deterministic and needs no table.
///
/// ```
/// use rf_switch_hub::config::RadioConfig;
/// use rf_switch_hub::packet::pipe_addresses;
///
/// let (tx, rx) = pipe_addresses(&RadioConfig::default(), 3);
/// assert_eq!(tx.bytes(), [0xE8, 0xE8, 0xF0, 0xF0, 0xE4]);
/// assert_eq!(rx.bytes(), [0xAB, 0xCD, 0xAB, 0xCD, 0x74]);
/// ```
pub fn pipe_addresses(radio: &RadioConfig, receiver: u8) -> (PipeAddress, PipeAddress) {
    (
        radio.write_base.offset(receiver),
        radio.read_base.offset(receiver),
    )
}
