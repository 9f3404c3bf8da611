//! Error types for the radio link, the device registry and request parsing.
//!
//! Every error here is a local, recoverable condition handed back to the
//! immediate caller. Nothing in the hub panics or exits on these.
//!
//! | Error | Raised by |
//! |-------|-----------|
//! | [`LinkError`] | [`RadioLink`](crate::RadioLink) when a packet is never confirmed |
//! | [`RequestError`] | [`ConfigRequest`](crate::ConfigRequest) parsing of form keys/values |
//! | [`HubError`] | Pins, devices and the hub; wraps the other two |

use crate::packet::Command;
use crate::pin::PinKind;
use crate::time::InvalidTime;

/// Failure to get a packet acknowledged by an edge device.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// Every attempt timed out or got a reply that was not the echo.
    #[error("device {receiver} did not confirm {command} after {attempts} attempt(s)")]
    NotConfirmed {
        /// Addressed board.
        receiver: u8,
        /// Command that was sent.
        command: Command,
        /// Attempts made.
        attempts: u8,
    },

    /// A multi-packet sequence stopped at its first unconfirmed packet.
    #[error("sequence to device {receiver} stopped after {confirmed} of {total} packet(s)")]
    SequenceAborted {
        /// Addressed board.
        receiver: u8,
        /// Packets confirmed before the failure.
        confirmed: usize,
        /// Packets in the sequence.
        total: usize,
        /// Failure of the packet that was not confirmed.
        #[source]
        cause: Box<LinkError>,
    },

    /// The radio driver rejected its start-up settings.
    #[error("radio initialisation failed: {0}")]
    Init(String),
}

/// A configuration request that could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// No `deviceId` entry.
    #[error("missing deviceId")]
    MissingDeviceId,

    /// `deviceId` is neither `-1` nor a board id.
    #[error("invalid deviceId {0:?}")]
    InvalidDeviceId(String),

    /// A key that is not `<pinId>:<field>`.
    #[error("malformed key {0:?}, expected <pinId>:<field>")]
    MalformedKey(String),

    /// A field name other than `state`, `onAt`, `offAt`.
    #[error("unknown field {0:?}")]
    UnknownField(String),

    /// A state value other than 0/1 (or on/off).
    #[error("invalid state {value:?} for pin {pin}")]
    InvalidState {
        /// Pin the value was meant for.
        pin: u8,
        /// Value as received.
        value: String,
    },

    /// A schedule value that is neither `HH:MM` nor `---`.
    #[error("pin {pin}: {source}")]
    InvalidTime {
        /// Pin the value was meant for.
        pin: u8,
        /// Parse failure.
        #[source]
        source: InvalidTime,
    },
}

/// Errors from the device registry and pin state machine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// No device with this id is registered.
    #[error("device {0} not found")]
    DeviceNotFound(u8),

    /// The device has no pin with this id.
    #[error("pin {pin} not found on device {device}")]
    PinNotFound {
        /// Device that was searched.
        device: u8,
        /// Missing pin id.
        pin: u8,
    },

    /// State change requested on a read-only pin.
    #[error("pin {pin} on device {device} is a {kind} and cannot be switched")]
    UnsupportedOperation {
        /// Owning device.
        device: u8,
        /// Pin id.
        pin: u8,
        /// The pin's kind.
        kind: PinKind,
    },

    /// The command was never confirmed; pin state left unchanged.
    #[error("transmission failed")]
    TransmissionFailed(#[from] LinkError),

    /// Only one of on/off time would be set.
    #[error("pin {pin} on device {device}: on and off times must both be set or both unset")]
    InvalidSchedule {
        /// Owning device.
        device: u8,
        /// Pin id.
        pin: u8,
    },

    /// The configuration request was malformed.
    #[error("invalid request")]
    InvalidRequest(#[from] RequestError),

    /// Two devices with the same id in the configuration.
    #[error("duplicate device id {0}")]
    DuplicateDevice(u8),

    /// Two pins with the same id on one device.
    #[error("duplicate pin {pin} on device {device}")]
    DuplicatePin {
        /// Owning device.
        device: u8,
        /// Repeated pin id.
        pin: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_error_display() {
        let err = LinkError::NotConfirmed {
            receiver: 3,
            command: Command::DigitalWrite,
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "device 3 did not confirm digital_write after 5 attempt(s)"
        );
    }

    #[test]
    fn transmission_failed_wraps_link_error() {
        let link = LinkError::NotConfirmed {
            receiver: 4,
            command: Command::Echo,
            attempts: 1,
        };
        let err: HubError = link.clone().into();
        assert_eq!(err, HubError::TransmissionFailed(link));
        assert_eq!(err.to_string(), "transmission failed");
    }

    #[test]
    fn request_error_converts() {
        let err: HubError = RequestError::MissingDeviceId.into();
        assert!(matches!(err, HubError::InvalidRequest(RequestError::MissingDeviceId)));
    }

    #[test]
    fn unsupported_display_names_kind() {
        let err = HubError::UnsupportedOperation {
            device: 3,
            pin: 5,
            kind: PinKind::DigitalInput,
        };
        assert_eq!(
            err.to_string(),
            "pin 5 on device 3 is a digital_input and cannot be switched"
        );
    }
}
