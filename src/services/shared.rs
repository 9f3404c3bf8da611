//! Shared hub state for the web API and the schedule ticker.
//!
//! `SharedHub` wraps the single [`ControlHub`] of the process. Every actor
//! (HTTP handlers, the scheduler thread) goes through it, so device state is
//! never touched concurrently, and the radio link underneath serializes the
//! packets themselves.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rf_switch_hub::config::HubConfig;
//! use rf_switch_hub::hal::{MockClock, MockTransport};
//! use rf_switch_hub::services::SharedHub;
//! use rf_switch_hub::{ControlHub, PinState};
//!
//! let hub = ControlHub::from_config(&HubConfig::demo(), MockTransport::new(), MockClock::new()).unwrap();
//! let shared = Arc::new(SharedHub::new(hub));
//!
//! shared.with_hub(|hub| hub.set_pin_state(3, 3, PinState::On)).unwrap();
//! assert_eq!(shared.snapshot().devices[0].pins[1].state, 1);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::device::ScheduleEvent;
use crate::error::HubError;
use crate::hal::SystemClock;
use crate::hub::{ControlHub, DeviceSnapshot, HubSnapshot};
use crate::time::TimeOfDay;
use crate::traits::{Clock, Transport};

/// The process-wide hub behind a mutex.
///
/// `Mutex` rather than `RwLock`: reads are short snapshots, and every write
/// already waits on the radio.
pub struct SharedHub<T: Transport, C: Clock = SystemClock> {
    hub: Mutex<ControlHub<T, C>>,
}

impl<T: Transport, C: Clock> SharedHub<T, C> {
    /// Wrap a hub.
    pub fn new(hub: ControlHub<T, C>) -> Self {
        Self {
            hub: Mutex::new(hub),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlHub<T, C>> {
        self.hub.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the hub.
    ///
    /// The closure form keeps the lock from being held across an `.await`.
    pub fn with_hub<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut ControlHub<T, C>) -> R,
    {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Current view of every device.
    pub fn snapshot(&self) -> HubSnapshot {
        self.lock().snapshot()
    }

    /// Current view of one device.
    pub fn device_snapshot(&self, id: u8) -> Result<DeviceSnapshot, HubError> {
        self.lock().device_snapshot(id)
    }

    /// Run one scheduler tick.
    pub fn refresh_schedules(&self, now: TimeOfDay) -> Vec<ScheduleEvent> {
        self.lock().refresh_schedules(now)
    }

    /// Plain-text listing.
    pub fn report(&self) -> String {
        self.lock().report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::HubConfig;
    use crate::hal::{MockClock, MockTransport};
    use crate::pin::{PinState, Schedule};

    fn shared() -> SharedHub<MockTransport, MockClock> {
        let hub = ControlHub::from_config(&HubConfig::demo(), MockTransport::new(), MockClock::new()).unwrap();
        SharedHub::new(hub)
    }

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    // ========================================================================
    // SharedHub tests
    // ========================================================================

    #[test]
    fn snapshot_reflects_changes() {
        let shared = shared();
        assert_eq!(shared.snapshot().devices.len(), 2);
        shared
            .with_hub(|hub| hub.set_pin_state(4, 3, PinState::On))
            .unwrap();
        assert_eq!(shared.device_snapshot(4).unwrap().pins[1].state, 1);
        assert!(shared.report().contains("device 4 pin 3 type=toggle_switch state=1"));
    }

    #[test]
    fn refresh_through_shared_state() {
        let shared = shared();
        shared.with_hub(|hub| {
            hub.lookup_mut(3)
                .unwrap()
                .pin_mut(3)
                .unwrap()
                .set_schedule(Some(Schedule::new(t("06:30"), t("06:45"))));
        });
        let events = shared.refresh_schedules(t("06:30"));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, Ok(PinState::On));
    }

    #[test]
    fn concurrent_actors_do_not_interleave_packets() {
        let shared = Arc::new(shared());
        let handles: Vec<_> = [3u8, 4u8]
            .into_iter()
            .map(|device| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    shared
                        .with_hub(|hub| hub.set_pin_state(device, 2, PinState::On))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Each momentary pulse is three consecutive packets to one board
        let written = shared.with_hub(|hub| hub.link().with_transport(|r| r.written()));
        assert_eq!(written.len(), 6);
        for pulse in written.chunks(3) {
            assert!(pulse.iter().all(|b| b[1] == pulse[0][1]));
            let bits: Vec<u8> = pulse.iter().map(|b| b[4]).collect();
            assert_eq!(bits, vec![0, 1, 0]);
        }
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let shared = Arc::new(shared());
        let clone = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            clone.with_hub(|_| panic!("handler crashed"));
        })
        .join();
        assert_eq!(shared.snapshot().devices.len(), 2);
    }
}
