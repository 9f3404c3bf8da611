//! Hardware abstraction traits for the radio transport and the time source.
//!
//! This module defines the two capabilities the hub needs from the platform:
//! a half-duplex packet radio and a clock that can also sleep.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`Transport`] | Half-duplex packet radio (nRF24-style pipes) |
//! | [`Clock`] | Monotonic milliseconds plus blocking sleep |
//!
//! # Implementation
//!
//! For testing and desktop development, use [`MockTransport`] and
//! [`MockClock`]. When no radio is attached, use [`NullTransport`]: every
//! command then fails with a transmission error but the rest of the hub keeps
//! running.
//!
//! [`MockTransport`]: crate::hal::MockTransport
//! [`MockClock`]: crate::hal::MockClock
//! [`NullTransport`]: crate::hal::NullTransport
//!
//! # Example
//!
//! ```rust
//! use rf_switch_hub::hal::MockTransport;
//! use rf_switch_hub::traits::{PipeAddress, Transport};
//!
//! let mut radio = MockTransport::new();
//! radio.open_writing_pipe(PipeAddress::new([0xE8, 0xE8, 0xF0, 0xF0, 0xE4])).unwrap();
//! radio.stop_listening();
//! radio.write(&[0, 3, 0xA1, 7, 0]).unwrap();
//! radio.start_listening();
//!
//! // The simulated board echoes the packet with sender/receiver swapped.
//! assert!(radio.available());
//! let mut buf = [0u8; 5];
//! assert_eq!(radio.read(&mut buf), 5);
//! assert_eq!(buf, [3, 0, 0xA1, 7, 0]);
//! ```

use core::fmt;

use crate::config::RadioConfig;
use crate::packet::PACKET_LEN;

/// Upper bound on reads done by [`Transport::flush_rx`].
pub const FLUSH_LIMIT: usize = 32;

/// A 5-byte radio pipe address.
///
/// Each edge device listens on one address and answers on another; both are
/// derived from the receiver id (see [`crate::packet::pipe_addresses`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipeAddress(pub [u8; 5]);

impl PipeAddress {
    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; 5]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes.
    pub const fn bytes(&self) -> [u8; 5] {
        self.0
    }

    /// Address shifted by `offset`, applied to the last byte with wrap-around.
    ///
    /// ```
    /// use rf_switch_hub::traits::PipeAddress;
    ///
    /// let base = PipeAddress::new([0xE8, 0xE8, 0xF0, 0xF0, 0xE1]);
    /// assert_eq!(base.offset(3).bytes(), [0xE8, 0xE8, 0xF0, 0xF0, 0xE4]);
    /// ```
    pub const fn offset(&self, offset: u8) -> Self {
        let mut bytes = self.0;
        bytes[4] = bytes[4].wrapping_add(offset);
        Self(bytes)
    }
}

impl fmt::Display for PipeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4]
        )
    }
}

/// Half-duplex packet radio.
///
/// Implement this trait for your radio driver (nRF24L01+ or similar). The
/// radio is either listening or transmitting, never both, and talks to one
/// receiver at a time through the currently opened pipes.
///
/// # Implementation Notes
///
/// - `write()` is only called between `stop_listening()` and `start_listening()`
/// - `read()` must fill at most `buf.len()` bytes and return the count
/// - `available()` must not block
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rf_switch_hub::traits::{PipeAddress, Transport};
///
/// struct Nrf24 { /* spi + ce pin */ }
///
/// impl Transport for Nrf24 {
///     type Error = SpiError;
///
///     fn open_writing_pipe(&mut self, address: PipeAddress) -> Result<(), SpiError> {
///         self.write_register(TX_ADDR, &address.bytes())
///     }
///     // ...
/// }
/// ```
pub trait Transport {
    /// Error type reported by the driver.
    type Error: fmt::Debug;

    /// Apply chip-level settings once at start-up.
    ///
    /// Default implementation does nothing.
    fn begin(&mut self, _config: &RadioConfig) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Point outbound packets at `address`.
    fn open_writing_pipe(&mut self, address: PipeAddress) -> Result<(), Self::Error>;

    /// Listen for replies on `address` using reading pipe number `pipe`.
    fn open_reading_pipe(&mut self, pipe: u8, address: PipeAddress) -> Result<(), Self::Error>;

    /// Switch to receive mode.
    fn start_listening(&mut self);

    /// Switch to transmit mode.
    fn stop_listening(&mut self);

    /// Transmit one payload. Only valid while not listening.
    fn write(&mut self, payload: &[u8]) -> Result<(), Self::Error>;

    /// Returns true if a received payload is waiting.
    fn available(&mut self) -> bool;

    /// Copy the next received payload into `buf`, returning its length.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Discard payloads already waiting, such as late echoes of an earlier
    /// packet. Called before every transmit.
    ///
    /// Default implementation reads until nothing is available, at most
    /// [`FLUSH_LIMIT`] times.
    fn flush_rx(&mut self) {
        let mut buf = [0u8; PACKET_LEN];
        for _ in 0..FLUSH_LIMIT {
            if !self.available() {
                break;
            }
            self.read(&mut buf);
        }
    }
}

/// Time source with blocking sleep.
///
/// The retry loop measures per-attempt timeouts with [`now_ms`](Self::now_ms)
/// and waits with [`sleep_ms`](Self::sleep_ms). Tests use
/// [`MockClock`](crate::hal::MockClock), which advances on every sleep so no
/// real time passes.
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `ms` milliseconds.
    fn sleep_ms(&self, ms: u64);
}
