//! Stand-ins for running without radio hardware.
//!
//! [`NullTransport`] accepts every call and never receives anything, so each
//! command times out and ends in a transmission failure. The rest of the hub
//! (registry, schedules, web API) keeps working, which is what you want on a
//! desktop or when the radio fails to initialise.
//!
//! [`SystemClock`] is the real time source: `Instant` for time and
//! `thread::sleep` for waiting.

use std::time::{Duration, Instant};

use crate::config::RadioConfig;
use crate::packet::HexBytes;
use crate::traits::{Clock, PipeAddress, Transport};

/// Radio that logs what it would send and never hears back.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl NullTransport {
    /// Create the stand-in.
    pub fn new() -> Self {
        Self
    }
}

impl Transport for NullTransport {
    type Error = core::convert::Infallible;

    fn begin(&mut self, config: &RadioConfig) -> Result<(), Self::Error> {
        tracing::warn!(
            channel = config.channel,
            "no radio hardware, commands will not be delivered"
        );
        Ok(())
    }

    fn open_writing_pipe(&mut self, _address: PipeAddress) -> Result<(), Self::Error> {
        Ok(())
    }

    fn open_reading_pipe(&mut self, _pipe: u8, _address: PipeAddress) -> Result<(), Self::Error> {
        Ok(())
    }

    fn start_listening(&mut self) {}

    fn stop_listening(&mut self) {}

    fn write(&mut self, payload: &[u8]) -> Result<(), Self::Error> {
        tracing::debug!(payload = %HexBytes(payload), "null radio: dropping packet");
        Ok(())
    }

    fn available(&mut self) -> bool {
        false
    }

    fn read(&mut self, _buf: &mut [u8]) -> usize {
        0
    }
}

/// Wall-clock time source backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Clock whose epoch is now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }
}
