//! Configuration requests from the outside world.
//!
//! A request arrives as flat string pairs (an HTML form, a query string):
//!
//! ```text
//! deviceId=3
//! 2:state=1
//! 3:onAt=18:40
//! 3:offAt=18:41
//! ```
//!
//! [`ConfigRequest::from_pairs`] parses every key and value once into typed
//! [`PinUpdate`]s, so nothing downstream handles raw strings. `deviceId=-1`
//! means "discard": the rest of the form is ignored.

use crate::error::RequestError;
use crate::pin::PinState;
use crate::time::{parse_optional, TimeOfDay};

/// Form key selecting the device.
pub const DEVICE_ID_KEY: &str = "deviceId";

/// `deviceId` value meaning "discard, no changes".
pub const DISCARD_DEVICE_ID: &str = "-1";

/// One field of one pin, with its parsed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinField {
    /// Requested level (`<pin>:state`).
    State(PinState),
    /// New on time, `None` to clear (`<pin>:onAt`).
    OnAt(Option<TimeOfDay>),
    /// New off time, `None` to clear (`<pin>:offAt`).
    OffAt(Option<TimeOfDay>),
}

/// A single parsed `<pinId>:<field>=<value>` entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinUpdate {
    /// Target pin id.
    pub pin: u8,
    /// Field and value.
    pub field: PinField,
}

impl PinUpdate {
    /// Set the state of `pin`.
    pub const fn state(pin: u8, state: PinState) -> Self {
        Self {
            pin,
            field: PinField::State(state),
        }
    }

    /// Set or clear the on time of `pin`.
    pub const fn on_at(pin: u8, at: Option<TimeOfDay>) -> Self {
        Self {
            pin,
            field: PinField::OnAt(at),
        }
    }

    /// Set or clear the off time of `pin`.
    pub const fn off_at(pin: u8, at: Option<TimeOfDay>) -> Self {
        Self {
            pin,
            field: PinField::OffAt(at),
        }
    }

    /// Parse one form entry.
    pub fn parse(key: &str, value: &str) -> Result<Self, RequestError> {
        let (pin, field) = key
            .split_once(':')
            .ok_or_else(|| RequestError::MalformedKey(key.to_string()))?;
        let pin: u8 = pin
            .trim()
            .parse()
            .map_err(|_| RequestError::MalformedKey(key.to_string()))?;

        let field = match field.trim() {
            "state" => PinField::State(PinState::from_text(value).ok_or_else(|| {
                RequestError::InvalidState {
                    pin,
                    value: value.to_string(),
                }
            })?),
            "onAt" => PinField::OnAt(parse_time(pin, value)?),
            "offAt" => PinField::OffAt(parse_time(pin, value)?),
            other => return Err(RequestError::UnknownField(other.to_string())),
        };
        Ok(Self { pin, field })
    }
}

fn parse_time(pin: u8, value: &str) -> Result<Option<TimeOfDay>, RequestError> {
    parse_optional(value).map_err(|source| RequestError::InvalidTime { pin, source })
}

/// Which device a request is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestTarget {
    /// Apply to this device.
    Device(u8),
    /// Do nothing.
    Discard,
}

/// A fully parsed configuration request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigRequest {
    /// Target device, or discard.
    pub target: RequestTarget,
    /// Updates in the order they were received.
    pub updates: Vec<PinUpdate>,
}

impl ConfigRequest {
    /// A request for `device`.
    pub fn for_device(device: u8, updates: Vec<PinUpdate>) -> Self {
        Self {
            target: RequestTarget::Device(device),
            updates,
        }
    }

    /// A request that changes nothing.
    pub fn discard() -> Self {
        Self {
            target: RequestTarget::Discard,
            updates: Vec::new(),
        }
    }

    /// True for a discard request.
    pub fn is_discard(&self) -> bool {
        self.target == RequestTarget::Discard
    }

    /// Parse form pairs.
    ///
    /// ```
    /// use rf_switch_hub::request::{ConfigRequest, PinUpdate, RequestTarget};
    /// use rf_switch_hub::pin::PinState;
    ///
    /// let req = ConfigRequest::from_pairs([("deviceId", "3"), ("2:state", "1")]).unwrap();
    /// assert_eq!(req.target, RequestTarget::Device(3));
    /// assert_eq!(req.updates, vec![PinUpdate::state(2, PinState::On)]);
    ///
    /// let req = ConfigRequest::from_pairs([("deviceId", "-1"), ("junk", "x")]).unwrap();
    /// assert!(req.is_discard());
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, RequestError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let pairs: Vec<(K, V)> = pairs.into_iter().collect();

        let device = pairs
            .iter()
            .find(|(k, _)| k.as_ref() == DEVICE_ID_KEY)
            .map(|(_, v)| v.as_ref().trim())
            .ok_or(RequestError::MissingDeviceId)?;

        if device == DISCARD_DEVICE_ID {
            return Ok(Self::discard());
        }
        let device: u8 = device
            .parse()
            .map_err(|_| RequestError::InvalidDeviceId(device.to_string()))?;

        let updates = pairs
            .iter()
            .filter(|(k, _)| k.as_ref() != DEVICE_ID_KEY)
            .map(|(k, v)| PinUpdate::parse(k.as_ref(), v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::for_device(device, updates))
    }
}
