//! Pins and their state machine.
//!
//! A [`Pin`] is one line on an edge device. Switch pins move between
//! [`PinState::Off`] and [`PinState::On`] only through [`Pin::set_state`],
//! which commits the new state once the board confirmed every packet:
//!
//! | Kind | Packets sent for a change |
//! |------|---------------------------|
//! | [`PinKind::ToggleSwitch`] | one digital write with the target level |
//! | [`PinKind::MomentarySwitch`] | the pulse `0, 1, 0`, whatever the target |
//! | [`PinKind::DigitalInput`], [`PinKind::AnalogInput`] | none, rejected |
//!
//! The committed state is what the hub last commanded. Boards do not report
//! back, so it can drift from the physical line.
//!
//! # Example
//!
//! ```rust
//! use rf_switch_hub::config::LinkConfig;
//! use rf_switch_hub::hal::{MockClock, MockTransport};
//! use rf_switch_hub::pin::{Pin, PinKind, PinState, StateChange};
//! use rf_switch_hub::RadioLink;
//!
//! let link = RadioLink::new(MockTransport::new(), MockClock::new(), LinkConfig::default());
//! let mut pin = Pin::new(3, 3, PinKind::ToggleSwitch);
//!
//! assert_eq!(pin.set_state(PinState::On, &link), Ok(StateChange::Switched { attempts: 1 }));
//! assert_eq!(pin.state(), PinState::On);
//!
//! // Already on: nothing is sent
//! assert_eq!(pin.set_state(PinState::On, &link), Ok(StateChange::Unchanged));
//! assert_eq!(link.with_transport(|r| r.write_count()), 1);
//! ```

use core::fmt;
use core::str::FromStr;

use crate::config::PinConfig;
use crate::error::HubError;
use crate::link::RadioLink;
use crate::time::TimeOfDay;
use crate::traits::{Clock, Transport};

/// Bits sent to a momentary switch to press it once.
pub const MOMENTARY_PULSE: [u8; 3] = [0, 1, 0];

// ============================================================================
// Pin Kind
// ============================================================================

/// What a pin is wired to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PinKind {
    /// Push-button style output, driven by a short pulse.
    MomentarySwitch,
    /// Latching output that follows the written level.
    ToggleSwitch,
    /// Read-only digital line.
    DigitalInput,
    /// Read-only analog line.
    AnalogInput,
}

impl PinKind {
    /// Name used in reports and configuration files.
    pub const fn name(self) -> &'static str {
        match self {
            PinKind::MomentarySwitch => "momentary_switch",
            PinKind::ToggleSwitch => "toggle_switch",
            PinKind::DigitalInput => "digital_input",
            PinKind::AnalogInput => "analog_input",
        }
    }

    /// True for kinds whose state can be set.
    #[inline]
    pub const fn is_switch(self) -> bool {
        matches!(self, PinKind::MomentarySwitch | PinKind::ToggleSwitch)
    }
}

impl fmt::Display for PinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PinKind {
    type Err = UnknownPinKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "momentary_switch" | "momentary" => Ok(PinKind::MomentarySwitch),
            "toggle_switch" | "toggle" => Ok(PinKind::ToggleSwitch),
            "digital_input" => Ok(PinKind::DigitalInput),
            "analog_input" => Ok(PinKind::AnalogInput),
            other => Err(UnknownPinKind(other.to_string())),
        }
    }
}

/// A pin kind name that is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown pin kind {0:?}")]
pub struct UnknownPinKind(pub String);

// ============================================================================
// Pin State
// ============================================================================

/// Level of a switch pin as last commanded by the hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PinState {
    /// Low / released.
    #[default]
    Off,
    /// High / pressed.
    On,
}

impl PinState {
    /// Wire value: 0 or 1.
    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            PinState::Off => 0,
            PinState::On => 1,
        }
    }

    /// From a wire value. Only 0 and 1 are valid.
    pub const fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            0 => Some(PinState::Off),
            1 => Some(PinState::On),
            _ => None,
        }
    }

    /// Parse a form value: `0`/`1`, `off`/`on` or `false`/`true`.
    pub fn from_text(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "off" | "false" => Some(PinState::Off),
            "1" | "on" | "true" => Some(PinState::On),
            _ => None,
        }
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bit())
    }
}

// ============================================================================
// Schedule
// ============================================================================

/// Daily on/off times. Equal times give a one-minute window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schedule {
    /// Minute to switch on.
    pub on_at: TimeOfDay,
    /// Minute to switch off.
    pub off_at: TimeOfDay,
}

impl Schedule {
    /// Build a schedule.
    pub const fn new(on_at: TimeOfDay, off_at: TimeOfDay) -> Self {
        Self { on_at, off_at }
    }

    /// Combine optional times. Fails when exactly one is set.
    pub fn from_times(
        on_at: Option<TimeOfDay>,
        off_at: Option<TimeOfDay>,
    ) -> Result<Option<Self>, HalfSchedule> {
        match (on_at, off_at) {
            (Some(on_at), Some(off_at)) => Ok(Some(Self::new(on_at, off_at))),
            (None, None) => Ok(None),
            _ => Err(HalfSchedule),
        }
    }

    /// What the schedule wants at `now` given the current state.
    ///
    /// Matches on the exact minute only; a missed minute waits for the next day.
    pub fn due(&self, now: TimeOfDay, state: PinState) -> Option<PinState> {
        if now == self.on_at && state == PinState::Off {
            Some(PinState::On)
        } else if now == self.off_at && state == PinState::On {
            Some(PinState::Off)
        } else {
            None
        }
    }
}

/// Only one of the on/off times was given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("on and off times must both be set or both unset")]
pub struct HalfSchedule;

// ============================================================================
// Pin
// ============================================================================

/// Outcome of a successful [`Pin::set_state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateChange {
    /// Already in the requested state; nothing was sent.
    Unchanged,
    /// Every packet confirmed and the new state was committed.
    Switched {
        /// Radio attempts across all packets.
        attempts: usize,
    },
}

/// One line on an edge device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pin {
    id: u8,
    device_id: u8,
    kind: PinKind,
    state: PinState,
    schedule: Option<Schedule>,
}

impl Pin {
    /// A pin in the `Off` state with no schedule.
    pub fn new(device_id: u8, id: u8, kind: PinKind) -> Self {
        Self {
            id,
            device_id,
            kind,
            state: PinState::Off,
            schedule: None,
        }
    }

    /// Build from configuration. Rejects a half-set schedule.
    pub fn from_config(device_id: u8, config: &PinConfig) -> Result<Self, HubError> {
        let mut pin = Self::new(device_id, config.id, config.kind);
        pin.set_schedule_times(config.on_at, config.off_at)?;
        Ok(pin)
    }

    /// Pin id on the board.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Id of the owning device.
    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    /// What the pin is wired to.
    pub fn kind(&self) -> PinKind {
        self.kind
    }

    /// Last committed state.
    pub fn state(&self) -> PinState {
        self.state
    }

    /// Current schedule, if any.
    pub fn schedule(&self) -> Option<Schedule> {
        self.schedule
    }

    /// Scheduled on time, if any.
    pub fn on_at(&self) -> Option<TimeOfDay> {
        self.schedule.map(|s| s.on_at)
    }

    /// Scheduled off time, if any.
    pub fn off_at(&self) -> Option<TimeOfDay> {
        self.schedule.map(|s| s.off_at)
    }

    /// Replace the schedule. Local only, nothing is sent.
    pub fn set_schedule(&mut self, schedule: Option<Schedule>) {
        self.schedule = schedule;
    }

    /// Replace the schedule from optional times.
    ///
    /// Fails with [`HubError::InvalidSchedule`] if exactly one is set; the
    /// previous schedule is kept.
    pub fn set_schedule_times(
        &mut self,
        on_at: Option<TimeOfDay>,
        off_at: Option<TimeOfDay>,
    ) -> Result<(), HubError> {
        let schedule = Schedule::from_times(on_at, off_at).map_err(|_| HubError::InvalidSchedule {
            device: self.device_id,
            pin: self.id,
        })?;
        self.schedule = schedule;
        Ok(())
    }

    /// Check that a state change is allowed for this kind.
    pub fn check_switchable(&self) -> Result<(), HubError> {
        if self.kind.is_switch() {
            Ok(())
        } else {
            Err(self.unsupported())
        }
    }

    fn unsupported(&self) -> HubError {
        HubError::UnsupportedOperation {
            device: self.device_id,
            pin: self.id,
            kind: self.kind,
        }
    }

    /// Drive the pin to `target`.
    ///
    /// Input pins are rejected without touching the radio. If the pin is
    /// already at `target` nothing is sent. Otherwise the state is committed
    /// only after every packet is confirmed; on failure it is unchanged.
    pub fn set_state<T: Transport, C: Clock>(
        &mut self,
        target: PinState,
        link: &RadioLink<T, C>,
    ) -> Result<StateChange, HubError> {
        self.check_switchable()?;

        if target == self.state {
            tracing::debug!(
                device = self.device_id,
                pin = self.id,
                state = %target,
                "pin already in requested state"
            );
            return Ok(StateChange::Unchanged);
        }

        let attempts = match self.kind {
            PinKind::ToggleSwitch => {
                usize::from(link.digital_write(self.device_id, self.id, target == PinState::On)?)
            }
            PinKind::MomentarySwitch => link.send_sequence(self.device_id, self.id, &MOMENTARY_PULSE)?,
            PinKind::DigitalInput | PinKind::AnalogInput => return Err(self.unsupported()),
        };

        self.state = target;
        tracing::info!(
            device = self.device_id,
            pin = self.id,
            kind = %self.kind,
            state = %target,
            attempts,
            "pin state committed"
        );
        Ok(StateChange::Switched { attempts })
    }

    /// Apply the schedule for `now`.
    ///
    /// Returns the state switched to, or `None` when nothing was due.
    pub fn refresh_schedule<T: Transport, C: Clock>(
        &mut self,
        now: TimeOfDay,
        link: &RadioLink<T, C>,
    ) -> Result<Option<PinState>, HubError> {
        let Some(target) = self.schedule.and_then(|s| s.due(now, self.state)) else {
            return Ok(None);
        };
        tracing::info!(
            device = self.device_id,
            pin = self.id,
            %now,
            state = %target,
            "schedule fired"
        );
        self.set_state(target, link)?;
        Ok(Some(target))
    }
}
