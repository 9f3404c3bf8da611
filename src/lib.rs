//! # rf-switch-hub
//!
//! A control hub for battery-powered radio boards ("edge devices") that
//! switch relays, optocouplers and LEDs, with daily on/off schedules.
//!
//! ## Features
//!
//! - **Confirmed delivery**: every 5-byte command is echoed back by the board
//!   and retried until it is, with bounded attempts and timeouts
//! - **Pin state machine**: toggle and momentary switches, read-only inputs,
//!   state committed only after the board confirmed
//! - **Schedules**: exact-minute daily on/off times per pin
//! - **Serialized radio**: the web API and the scheduler share one half-duplex
//!   radio without interleaving packets
//! - **Testable without hardware**: mock radio that drops, corrupts or delays
//!   replies, and a mock clock that never really sleeps
//!
//! ## Architecture
//!
//! - `traits` - Radio transport and clock abstractions
//! - `packet` - Wire format and command codes
//! - `link` - Send-with-confirm over a shared transport
//! - `pin` / `device` / `hub` - The device model and registry
//! - `request` - Parsing configuration forms into typed updates
//! - `hal` - Concrete implementations (mock for testing, null for no hardware)
//! - `services` - Web API and schedule ticker (feature `web`)
//!
//! ## Example
//!
//! ```rust
//! use rf_switch_hub::{
//!     config::HubConfig,
//!     hal::{MockClock, MockTransport},
//!     ConfigRequest, ControlHub, PinState, TimeOfDay,
//! };
//!
//! let mut hub = ControlHub::from_config(&HubConfig::demo(), MockTransport::new(), MockClock::new()).unwrap();
//!
//! // Schedule pin 3 of board 4, as the web form would
//! let form = [
//!     ("deviceId", "4"),
//!     ("3:onAt", "18:40"),
//!     ("3:offAt", "18:41"),
//! ];
//! hub.apply(&ConfigRequest::from_pairs(form).unwrap()).unwrap();
//!
//! // The scheduler tick switches it on at 18:40
//! let events = hub.refresh_schedules(TimeOfDay::new(18, 40).unwrap());
//! assert_eq!(events.len(), 1);
//! assert_eq!(hub.lookup(4).unwrap().pin(3).unwrap().state(), PinState::On);
//! ```

#![warn(missing_docs)]

/// Configuration for the hub, its radio and its devices.
pub mod config;
/// Edge devices and batch configuration.
pub mod device;
/// Error types.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Device registry, fleet refresh and read-only snapshots.
pub mod hub;
/// Confirmed, serialized packet delivery.
pub mod link;
/// Wire packets and command codes.
pub mod packet;
/// Pin kinds, states, schedules and the pin state machine.
pub mod pin;
/// Configuration request parsing.
pub mod request;
/// Minute-resolution time of day.
pub mod time;
/// Core traits for hardware abstraction.
pub mod traits;

/// Web API and schedule ticker (feature-gated).
#[cfg(feature = "web")]
pub mod services;

// Re-exports for convenience
pub use device::{ConfigureReport, EdgeDevice, ScheduleEvent};
pub use error::{HubError, LinkError, RequestError};
pub use hub::{ControlHub, DeviceSnapshot, HubSnapshot, PinSnapshot};
pub use link::RadioLink;
pub use packet::{Command, Packet};
pub use pin::{Pin, PinKind, PinState, Schedule, StateChange};
pub use request::{ConfigRequest, PinField, PinUpdate, RequestTarget};
pub use time::TimeOfDay;
pub use traits::{Clock, PipeAddress, Transport};

// Config re-exports
pub use config::{DeviceConfig, HubConfig, LinkConfig, PinConfig, RadioConfig, SchedulerConfig, WebConfig};
