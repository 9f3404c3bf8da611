//! The control hub: registry of edge devices sharing one radio link.
//!
//! [`ControlHub`] is built once at start-up (usually from a
//! [`HubConfig`]) and then only its pins change. Every entry point, from the
//! web API and from the scheduler tick alike, goes through it.
//!
//! # Example
//!
//! ```rust
//! use rf_switch_hub::config::HubConfig;
//! use rf_switch_hub::hal::{MockClock, MockTransport};
//! use rf_switch_hub::pin::PinState;
//! use rf_switch_hub::ControlHub;
//!
//! let mut hub = ControlHub::from_config(&HubConfig::demo(), MockTransport::new(), MockClock::new()).unwrap();
//! hub.set_pin_state(4, 3, PinState::On).unwrap();
//!
//! assert_eq!(hub.lookup(4).unwrap().pin(3).unwrap().state(), PinState::On);
//! assert!(hub.report().contains("device 4 pin 3 type=toggle_switch state=1"));
//! ```

use core::fmt;
use std::sync::Arc;

use crate::config::{short_string, HubConfig, ShortString};
use crate::device::{ConfigureReport, EdgeDevice, ScheduleEvent};
use crate::error::HubError;
use crate::hal::SystemClock;
use crate::link::RadioLink;
use crate::pin::{PinKind, PinState, StateChange};
use crate::request::{ConfigRequest, PinUpdate, RequestTarget};
use crate::time::{format_optional, TimeOfDay};
use crate::traits::{Clock, Transport};

// ============================================================================
// Snapshots
// ============================================================================

/// Read-only view of one pin.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PinSnapshot {
    /// Pin id.
    pub id: u8,
    /// Pin kind.
    pub kind: PinKind,
    /// Last committed state, 0 or 1.
    pub state: u8,
    /// `"HH:MM"` or `"---"`.
    pub on_at: String,
    /// `"HH:MM"` or `"---"`.
    pub off_at: String,
}

/// Read-only view of one device.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviceSnapshot {
    /// Device id.
    pub id: u8,
    /// Device name.
    pub name: String,
    /// Pins in ascending id order.
    pub pins: Vec<PinSnapshot>,
}

/// Read-only view of the whole hub.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HubSnapshot {
    /// Hub name.
    pub name: String,
    /// Devices in registration order.
    pub devices: Vec<DeviceSnapshot>,
}

impl From<&EdgeDevice> for DeviceSnapshot {
    fn from(device: &EdgeDevice) -> Self {
        Self {
            id: device.id(),
            name: device.name().to_string(),
            pins: device
                .pins()
                .map(|pin| PinSnapshot {
                    id: pin.id(),
                    kind: pin.kind(),
                    state: pin.state().bit(),
                    on_at: format_optional(pin.on_at()),
                    off_at: format_optional(pin.off_at()),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Control Hub
// ============================================================================

/// Registry of edge devices and the radio link they share.
pub struct ControlHub<T: Transport, C: Clock = SystemClock> {
    name: ShortString,
    devices: Vec<EdgeDevice>,
    link: Arc<RadioLink<T, C>>,
}

impl<T: Transport, C: Clock> ControlHub<T, C> {
    /// An empty hub using `link`.
    pub fn new(name: &str, link: RadioLink<T, C>) -> Self {
        Self {
            name: short_string(name),
            devices: Vec::new(),
            link: Arc::new(link),
        }
    }

    /// Build the link and every configured device.
    ///
    /// Fails on duplicate device ids, duplicate pin ids or a half-set
    /// schedule in the configuration.
    pub fn from_config(config: &HubConfig, transport: T, clock: C) -> Result<Self, HubError> {
        let link = RadioLink::new(transport, clock, config.link).with_radio_config(config.radio);
        let mut hub = Self::new(config.name.as_str(), link);
        for device in &config.devices {
            hub.register(EdgeDevice::from_config(device)?)?;
        }
        tracing::info!(
            hub = %hub.name,
            devices = hub.devices.len(),
            "hub configured"
        );
        Ok(hub)
    }

    /// Add a device. Fails if its id is already registered.
    pub fn register(&mut self, device: EdgeDevice) -> Result<(), HubError> {
        if self.devices.iter().any(|d| d.id() == device.id()) {
            return Err(HubError::DuplicateDevice(device.id()));
        }
        self.devices.push(device);
        Ok(())
    }

    /// Hub name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The shared radio link.
    pub fn link(&self) -> &RadioLink<T, C> {
        &self.link
    }

    /// Devices in registration order.
    pub fn devices(&self) -> impl Iterator<Item = &EdgeDevice> {
        self.devices.iter()
    }

    /// Device by id.
    pub fn lookup(&self, id: u8) -> Result<&EdgeDevice, HubError> {
        self.devices
            .iter()
            .find(|d| d.id() == id)
            .ok_or(HubError::DeviceNotFound(id))
    }

    /// Mutable device by id.
    pub fn lookup_mut(&mut self, id: u8) -> Result<&mut EdgeDevice, HubError> {
        self.devices
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or(HubError::DeviceNotFound(id))
    }

    /// Drive one pin of one device.
    pub fn set_pin_state(&mut self, device: u8, pin: u8, state: PinState) -> Result<StateChange, HubError> {
        let link = Arc::clone(&self.link);
        self.lookup_mut(device)?.set_pin_state(pin, state, &*link)
    }

    /// Apply a batch of updates to one device.
    pub fn configure(&mut self, device: u8, updates: &[PinUpdate]) -> Result<ConfigureReport, HubError> {
        let link = Arc::clone(&self.link);
        self.lookup_mut(device)?.configure(updates, &*link)
    }

    /// Apply a parsed request. A discard request returns `Ok(None)`.
    pub fn apply(&mut self, request: &ConfigRequest) -> Result<Option<ConfigureReport>, HubError> {
        match request.target {
            RequestTarget::Discard => {
                tracing::debug!("configuration request discarded");
                Ok(None)
            }
            RequestTarget::Device(id) => self.configure(id, &request.updates).map(Some),
        }
    }

    /// Run every device's schedules for `now`, in registration order.
    pub fn refresh_schedules(&mut self, now: TimeOfDay) -> Vec<ScheduleEvent> {
        let link: &RadioLink<T, C> = &self.link;
        self.devices
            .iter_mut()
            .flat_map(|device| device.refresh_schedules(now, link))
            .collect()
    }

    /// Device view by id.
    pub fn device_snapshot(&self, id: u8) -> Result<DeviceSnapshot, HubError> {
        self.lookup(id).map(DeviceSnapshot::from)
    }

    /// View of every device and pin.
    pub fn snapshot(&self) -> HubSnapshot {
        HubSnapshot {
            name: self.name().to_string(),
            devices: self.devices.iter().map(DeviceSnapshot::from).collect(),
        }
    }

    /// Plain-text listing of devices and pins.
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl<T: Transport, C: Clock> fmt::Display for ControlHub<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for device in &self.devices {
            writeln!(f, " device name={} id={}", device.name(), device.id())?;
            for pin in device.pins() {
                write!(
                    f,
                    "  device {} pin {} type={} state={}",
                    device.id(),
                    pin.id(),
                    pin.kind(),
                    pin.state()
                )?;
                if let Some(s) = pin.schedule() {
                    write!(f, " on={} off={}", s.on_at, s.off_at)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl<T: Transport, C: Clock> fmt::Debug for ControlHub<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlHub")
            .field("name", &self.name)
            .field("devices", &self.devices)
            .finish_non_exhaustive()
    }
}
