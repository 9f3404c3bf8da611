//! Edge devices: one radio board and its pins.
//!
//! An [`EdgeDevice`] owns a fixed set of [`Pin`]s keyed by pin id. It applies
//! batches of [`PinUpdate`]s from the configuration API and runs the schedule
//! check for each pin on every scheduler tick. Pins are always visited in
//! ascending id order.

use std::collections::BTreeMap;

use crate::config::{short_string, DeviceConfig, ShortString};
use crate::error::HubError;
use crate::link::RadioLink;
use crate::pin::{Pin, PinKind, PinState, Schedule, StateChange};
use crate::request::{PinField, PinUpdate};
use crate::time::TimeOfDay;
use crate::traits::{Clock, Transport};

/// What happened to each pin of a [`EdgeDevice::configure`] batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigureReport {
    /// Device the batch was applied to.
    pub device: u8,
    /// Pins whose schedule was replaced.
    pub schedules_updated: Vec<u8>,
    /// Pins switched, with the committed state.
    pub switched: Vec<(u8, PinState)>,
    /// Pins already in the requested state.
    pub unchanged: Vec<u8>,
    /// Pins whose state change failed; their state is unchanged.
    pub failed: Vec<(u8, HubError)>,
}

impl ConfigureReport {
    /// True if no state change failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A schedule that came due during a refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleEvent {
    /// Owning device.
    pub device: u8,
    /// Pin whose schedule fired.
    pub pin: u8,
    /// State committed, or why the switch failed.
    pub outcome: Result<PinState, HubError>,
}

#[derive(Default)]
struct PendingPin {
    state: Option<PinState>,
    on_at: Option<Option<TimeOfDay>>,
    off_at: Option<Option<TimeOfDay>>,
}

struct PlannedPin {
    pin: u8,
    schedule: Option<Option<Schedule>>,
    state: Option<PinState>,
}

/// One radio board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeDevice {
    id: u8,
    name: ShortString,
    pins: BTreeMap<u8, Pin>,
}

impl EdgeDevice {
    /// A device with no pins.
    pub fn new(id: u8, name: &str) -> Self {
        Self {
            id,
            name: short_string(name),
            pins: BTreeMap::new(),
        }
    }

    /// Build from configuration, rejecting duplicate pin ids.
    pub fn from_config(config: &DeviceConfig) -> Result<Self, HubError> {
        let mut device = Self {
            id: config.id,
            name: config.name.clone(),
            pins: BTreeMap::new(),
        };
        for pin in &config.pins {
            device.insert(Pin::from_config(config.id, pin)?)?;
        }
        Ok(device)
    }

    /// Add an unscheduled pin. Fails if the id is taken.
    pub fn add_pin(&mut self, id: u8, kind: PinKind) -> Result<&mut Pin, HubError> {
        self.insert(Pin::new(self.id, id, kind))
    }

    fn insert(&mut self, pin: Pin) -> Result<&mut Pin, HubError> {
        use std::collections::btree_map::Entry;

        match self.pins.entry(pin.id()) {
            Entry::Occupied(_) => Err(HubError::DuplicatePin {
                device: self.id,
                pin: pin.id(),
            }),
            Entry::Vacant(slot) => Ok(slot.insert(pin)),
        }
    }

    /// Board id, also its radio address.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Pins in ascending id order.
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.values()
    }

    /// Pin by id.
    pub fn pin(&self, id: u8) -> Result<&Pin, HubError> {
        self.pins.get(&id).ok_or(HubError::PinNotFound {
            device: self.id,
            pin: id,
        })
    }

    /// Mutable pin by id.
    pub fn pin_mut(&mut self, id: u8) -> Result<&mut Pin, HubError> {
        let device = self.id;
        self.pins
            .get_mut(&id)
            .ok_or(HubError::PinNotFound { device, pin: id })
    }

    /// Drive one pin.
    pub fn set_pin_state<T: Transport, C: Clock>(
        &mut self,
        pin: u8,
        state: PinState,
        link: &RadioLink<T, C>,
    ) -> Result<StateChange, HubError> {
        self.pin_mut(pin)?.set_state(state, link)
    }

    /// Apply a batch of updates.
    ///
    /// The whole batch is validated first; an unknown pin, a half-set
    /// schedule or a state change on an input pin fails it without touching
    /// anything. Then pins are processed in ascending id order, schedule
    /// before state. A failed state change does not stop the batch; it is
    /// recorded in the report.
    pub fn configure<T: Transport, C: Clock>(
        &mut self,
        updates: &[PinUpdate],
        link: &RadioLink<T, C>,
    ) -> Result<ConfigureReport, HubError> {
        let plan = self.plan(updates)?;

        let mut report = ConfigureReport {
            device: self.id,
            ..ConfigureReport::default()
        };
        for planned in plan {
            let Some(pin) = self.pins.get_mut(&planned.pin) else {
                continue;
            };
            if let Some(schedule) = planned.schedule {
                pin.set_schedule(schedule);
                report.schedules_updated.push(planned.pin);
                tracing::info!(
                    device = self.id,
                    pin = planned.pin,
                    on_at = ?schedule.map(|s| s.on_at),
                    off_at = ?schedule.map(|s| s.off_at),
                    "schedule updated"
                );
            }
            if let Some(target) = planned.state {
                match pin.set_state(target, link) {
                    Ok(StateChange::Switched { .. }) => report.switched.push((planned.pin, target)),
                    Ok(StateChange::Unchanged) => report.unchanged.push(planned.pin),
                    Err(err) => {
                        tracing::warn!(device = self.id, pin = planned.pin, error = %err, "state change failed");
                        report.failed.push((planned.pin, err));
                    }
                }
            }
        }
        Ok(report)
    }

    fn plan(&self, updates: &[PinUpdate]) -> Result<Vec<PlannedPin>, HubError> {
        let mut pending: BTreeMap<u8, PendingPin> = BTreeMap::new();
        for update in updates {
            let entry = pending.entry(update.pin).or_default();
            match update.field {
                PinField::State(state) => entry.state = Some(state),
                PinField::OnAt(at) => entry.on_at = Some(at),
                PinField::OffAt(at) => entry.off_at = Some(at),
            }
        }

        pending
            .into_iter()
            .map(|(id, p)| {
                let pin = self.pin(id)?;
                if p.state.is_some() {
                    pin.check_switchable()?;
                }
                let schedule = if p.on_at.is_some() || p.off_at.is_some() {
                    let on_at = p.on_at.unwrap_or(pin.on_at());
                    let off_at = p.off_at.unwrap_or(pin.off_at());
                    let schedule = Schedule::from_times(on_at, off_at).map_err(|_| {
                        HubError::InvalidSchedule {
                            device: self.id,
                            pin: id,
                        }
                    })?;
                    Some(schedule)
                } else {
                    None
                };
                Ok(PlannedPin {
                    pin: id,
                    schedule,
                    state: p.state,
                })
            })
            .collect()
    }

    /// Run every pin's schedule check for `now`.
    ///
    /// Returns one event per schedule that came due. A failed switch is
    /// logged and reported, and does not stop the remaining pins.
    pub fn refresh_schedules<T: Transport, C: Clock>(
        &mut self,
        now: TimeOfDay,
        link: &RadioLink<T, C>,
    ) -> Vec<ScheduleEvent> {
        let mut events = Vec::new();
        for pin in self.pins.values_mut() {
            let outcome = match pin.refresh_schedule(now, link) {
                Ok(None) => continue,
                Ok(Some(state)) => Ok(state),
                Err(err) => {
                    tracing::warn!(
                        device = self.id,
                        pin = pin.id(),
                        %now,
                        error = %err,
                        "scheduled switch failed"
                    );
                    Err(err)
                }
            };
            events.push(ScheduleEvent {
                device: self.id,
                pin: pin.id(),
                outcome,
            });
        }
        events
    }
}
