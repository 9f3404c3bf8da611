//! Confirmed packet delivery over the radio.
//!
//! [`RadioLink`] owns the [`Transport`] behind a mutex, so every exchange
//! (one packet plus its echo, or a whole pulse sequence) runs without
//! interleaving with any other caller. Each attempt follows the same cycle:
//!
//! 1. Re-open the writing and reading pipes for the receiver
//! 2. Drop anything still queued, stop listening, write the 5 bytes, start
//!    listening
//! 3. Poll for a reply until the attempt timeout
//! 4. The first reply decides: exact echo confirms, anything else fails
//!
//! Failed attempts are separated by `pause_between_attempts_ms`; the last one
//! is not followed by a pause.
//!
//! # Example
//!
//! ```rust
//! use rf_switch_hub::config::LinkConfig;
//! use rf_switch_hub::hal::{MockClock, MockTransport};
//! use rf_switch_hub::packet::Command;
//! use rf_switch_hub::RadioLink;
//!
//! let link = RadioLink::new(MockTransport::new(), MockClock::new(), LinkConfig::default());
//! assert_eq!(link.send(3, Command::DigitalWrite, 2, 1), Ok(1));
//!
//! let sent = link.with_transport(|radio| radio.written());
//! assert_eq!(sent, vec![[0x00, 0x03, 0xA4, 0x02, 0x01]]);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{LinkConfig, RadioConfig};
use crate::error::LinkError;
use crate::hal::SystemClock;
use crate::packet::{pipe_addresses, Command, HexBytes, Packet, PACKET_LEN, REPLY_PIPE};
use crate::traits::{Clock, Transport};

/// Serialized, confirmed access to the radio.
///
/// Shared by every actor in the process (usually behind an `Arc`). All
/// methods take `&self`; the internal mutex provides exclusion.
pub struct RadioLink<T: Transport, C: Clock = SystemClock> {
    transport: Mutex<T>,
    clock: C,
    config: LinkConfig,
    radio: RadioConfig,
}

impl<T: Transport, C: Clock> RadioLink<T, C> {
    /// Wrap a transport with the default radio settings.
    pub fn new(transport: T, clock: C, config: LinkConfig) -> Self {
        Self {
            transport: Mutex::new(transport),
            clock,
            config,
            radio: RadioConfig::default(),
        }
    }

    /// Replace the radio chip settings (channel, base addresses, ...).
    pub fn with_radio_config(mut self, radio: RadioConfig) -> Self {
        self.radio = radio;
        self
    }

    /// Apply the radio settings to the transport. Call once at start-up.
    pub fn begin(&self) -> Result<(), LinkError> {
        let radio = self.radio;
        let mut transport = self.lock();
        transport
            .begin(&radio)
            .map_err(|e| LinkError::Init(format!("{e:?}")))?;
        tracing::info!(
            channel = radio.channel,
            write_base = %radio.write_base,
            read_base = %radio.read_base,
            "radio initialised"
        );
        Ok(())
    }

    /// Retry and timing policy.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Radio chip settings.
    pub fn radio_config(&self) -> &RadioConfig {
        &self.radio
    }

    /// The clock used for timeouts and pauses.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run `f` with exclusive access to the transport.
    ///
    /// Mainly for tests that inspect or script a mock radio.
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut transport = self.lock();
        f(&mut transport)
    }

    // ========================================================================
    // Confirmed sends
    // ========================================================================

    /// Send a command from the hub to `receiver` and wait for its echo.
    ///
    /// Returns the number of attempts it took.
    pub fn send(&self, receiver: u8, command: Command, arg1: u8, arg2: u8) -> Result<u8, LinkError> {
        let packet = Packet::new(self.config.hub_address, receiver, command, arg1, arg2);
        self.send_with_confirm(packet, &self.config)
    }

    /// Send `packet` with an explicit retry policy.
    ///
    /// Makes exactly `policy.max_attempts` attempts at most; zero sends
    /// nothing and fails. Driver errors count as failed attempts.
    pub fn send_with_confirm(&self, packet: Packet, policy: &LinkConfig) -> Result<u8, LinkError> {
        let mut transport = self.lock();
        self.exchange(&mut transport, packet, policy)
    }

    /// Send `bits` as consecutive digital writes to `pin`.
    ///
    /// The whole sequence holds the radio, and every packet is followed by
    /// `message_spacing_ms`. Stops at the first unconfirmed packet.
    /// Returns the total number of attempts.
    pub fn send_sequence(&self, receiver: u8, pin: u8, bits: &[u8]) -> Result<usize, LinkError> {
        let policy = self.config;
        let mut transport = self.lock();
        let mut attempts = 0usize;

        for (confirmed, &bit) in bits.iter().enumerate() {
            let packet = Packet::new(policy.hub_address, receiver, Command::DigitalWrite, pin, bit);
            match self.exchange(&mut transport, packet, &policy) {
                Ok(n) => attempts += usize::from(n),
                Err(err) => {
                    tracing::warn!(
                        receiver,
                        pin,
                        confirmed,
                        total = bits.len(),
                        "sequence aborted"
                    );
                    return Err(LinkError::SequenceAborted {
                        receiver,
                        confirmed,
                        total: bits.len(),
                        cause: Box::new(err),
                    });
                }
            }
            self.clock.sleep_ms(u64::from(policy.message_spacing_ms));
        }
        Ok(attempts)
    }

    // ========================================================================
    // Command helpers
    // ========================================================================

    /// Check the link: the board echoes `value` back.
    pub fn ping(&self, receiver: u8, value: u8) -> Result<u8, LinkError> {
        self.send(receiver, Command::Echo, value, 0)
    }

    /// Configure `pin` as an output (`true`) or input.
    pub fn set_pin_mode(&self, receiver: u8, pin: u8, output: bool) -> Result<u8, LinkError> {
        self.send(receiver, Command::SetPinMode, pin, u8::from(output))
    }

    /// Drive `pin` high or low.
    pub fn digital_write(&self, receiver: u8, pin: u8, high: bool) -> Result<u8, LinkError> {
        self.send(receiver, Command::DigitalWrite, pin, u8::from(high))
    }

    /// Set the PWM duty of `pin` (0-255).
    pub fn analog_write(&self, receiver: u8, pin: u8, duty: u8) -> Result<u8, LinkError> {
        self.send(receiver, Command::AnalogWrite, pin, duty)
    }

    /// Ask the board to measure its supply voltage.
    pub fn request_voltage(&self, receiver: u8) -> Result<u8, LinkError> {
        self.send(receiver, Command::ReadVoltage, 0, 0)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lock(&self) -> MutexGuard<'_, T> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn exchange(&self, transport: &mut T, packet: Packet, policy: &LinkConfig) -> Result<u8, LinkError> {
        let attempts = policy.max_attempts;
        for attempt in 1..=attempts {
            if self.attempt(transport, &packet, policy) {
                tracing::debug!(%packet, attempt, "confirmed");
                return Ok(attempt);
            }
            tracing::debug!(%packet, attempt, "attempt failed");
            if attempt < attempts {
                self.clock
                    .sleep_ms(u64::from(policy.pause_between_attempts_ms));
            }
        }

        tracing::warn!(
            %packet,
            receiver = packet.receiver,
            command = %packet.command,
            attempts,
            "retries exhausted"
        );
        Err(LinkError::NotConfirmed {
            receiver: packet.receiver,
            command: packet.command,
            attempts,
        })
    }

    /// One transmit plus wait. True if the exact echo came back in time.
    fn attempt(&self, transport: &mut T, packet: &Packet, policy: &LinkConfig) -> bool {
        let (tx, rx) = pipe_addresses(&self.radio, packet.receiver);
        if let Err(e) = transport.open_writing_pipe(tx) {
            tracing::debug!(error = ?e, "open writing pipe failed");
            return false;
        }
        if let Err(e) = transport.open_reading_pipe(REPLY_PIPE, rx) {
            tracing::debug!(error = ?e, "open reading pipe failed");
            return false;
        }

        transport.flush_rx();
        transport.stop_listening();
        tracing::debug!(%packet, pipe = %tx, "sending message");
        let written = transport.write(&packet.to_bytes());
        transport.start_listening();
        if let Err(e) = written {
            tracing::debug!(error = ?e, "write failed");
            return false;
        }

        self.await_reply(transport, packet, policy)
    }

    fn await_reply(&self, transport: &mut T, packet: &Packet, policy: &LinkConfig) -> bool {
        let timeout = u64::from(policy.attempt_timeout_ms);
        // A zero interval would spin forever on a clock that only moves on sleep
        let poll = u64::from(policy.poll_interval_ms.max(1));
        let start = self.clock.now_ms();

        loop {
            if transport.available() {
                let mut buf = [0u8; PACKET_LEN];
                let n = transport.read(&mut buf).min(PACKET_LEN);
                let reply = &buf[..n];
                tracing::debug!(reply = %HexBytes(reply), "received message");
                return packet.is_confirmed_by(reply);
            }
            if self.clock.now_ms().saturating_sub(start) >= timeout {
                tracing::debug!(%packet, "received message timed out");
                return false;
            }
            self.clock.sleep_ms(poll);
        }
    }
}

impl<T: Transport, C: Clock> core::fmt::Debug for RadioLink<T, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RadioLink")
            .field("config", &self.config)
            .field("radio", &self.radio)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockClock, MockTransport, RadioEvent, ReplyFault};

    fn link(radio: MockTransport) -> RadioLink<MockTransport, MockClock> {
        RadioLink::new(radio, MockClock::new(), LinkConfig::default())
    }

    // =========================================================================
    // Attempt Cycle Tests
    // =========================================================================

    #[test]
    fn first_attempt_confirms() {
        let link = link(MockTransport::new());
        assert_eq!(link.send(3, Command::DigitalWrite, 2, 1), Ok(1));
        assert_eq!(link.clock().total_slept_ms(), 0);
    }

    #[test]
    fn attempt_reopens_pipes_and_toggles_listening() {
        let link = link(MockTransport::new());
        link.ping(4, 9).unwrap();

        let radio = RadioConfig::default();
        let events = link.with_transport(|r| r.events.clone());
        assert_eq!(
            events,
            vec![
                RadioEvent::OpenWritingPipe(radio.write_base.offset(4)),
                RadioEvent::OpenReadingPipe(REPLY_PIPE, radio.read_base.offset(4)),
                RadioEvent::StopListening,
                RadioEvent::Write([0, 4, 0xA1, 9, 0]),
                RadioEvent::StartListening,
            ]
        );
    }

    #[test]
    fn sender_is_hub_address() {
        let radio = MockTransport::new();
        let link = RadioLink::new(
            radio,
            MockClock::new(),
            LinkConfig::default().with_hub_address(7),
        );
        link.ping(3, 1).unwrap();
        let written = link.with_transport(|r| r.written());
        assert_eq!(written[0][0], 7);
    }

    // =========================================================================
    // Retry Tests
    // =========================================================================

    #[test]
    fn pauses_only_between_attempts() {
        let policy = LinkConfig::default()
            .with_max_attempts(3)
            .with_attempt_timeout_ms(100)
            .with_poll_interval_ms(10)
            .with_pause_between_attempts_ms(50);
        let link = RadioLink::new(MockTransport::offline(), MockClock::new(), policy);

        let err = link.send(3, Command::Echo, 1, 0).unwrap_err();
        assert_eq!(
            err,
            LinkError::NotConfirmed {
                receiver: 3,
                command: Command::Echo,
                attempts: 3
            }
        );
        // 3 timeouts of 100ms plus 2 pauses of 50ms
        assert_eq!(link.clock().total_slept_ms(), 400);
        assert_eq!(link.with_transport(|r| r.write_count()), 3);
    }

    #[test]
    fn zero_attempts_sends_nothing() {
        let link = RadioLink::new(
            MockTransport::new(),
            MockClock::new(),
            LinkConfig::default().with_max_attempts(0),
        );
        assert_eq!(
            link.send(3, Command::DigitalWrite, 2, 1),
            Err(LinkError::NotConfirmed {
                receiver: 3,
                command: Command::DigitalWrite,
                attempts: 0
            })
        );
        assert_eq!(link.with_transport(|r| r.write_count()), 0);
        assert_eq!(link.clock().total_slept_ms(), 0);
    }

    #[test]
    fn corrupted_echo_fails_attempt() {
        let mut radio = MockTransport::new();
        radio.corrupt_next(2);
        let link = link(radio);
        assert_eq!(link.ping(3, 5), Ok(3));
    }

    #[test]
    fn write_error_counts_as_attempt() {
        let mut radio = MockTransport::new();
        radio.fail_next_writes(1);
        let link = link(radio);
        assert_eq!(link.ping(3, 5), Ok(2));
        // The failed write never reached the air
        assert_eq!(link.with_transport(|r| r.write_count()), 1);
    }

    #[test]
    fn queued_stray_packet_is_flushed() {
        let mut radio = MockTransport::new();
        radio.start_listening();
        radio.inject([9, 0, 0xA1, 0, 0]);
        let link = link(radio);
        assert_eq!(link.ping(3, 5), Ok(1));
    }

    /// Echoes every packet but claims a longer payload than it copied.
    #[derive(Default)]
    struct OverReportingRadio {
        listening: bool,
        reply: Option<[u8; PACKET_LEN]>,
    }

    impl Transport for OverReportingRadio {
        type Error = ();

        fn open_writing_pipe(&mut self, _address: crate::traits::PipeAddress) -> Result<(), ()> {
            Ok(())
        }

        fn open_reading_pipe(&mut self, _pipe: u8, _address: crate::traits::PipeAddress) -> Result<(), ()> {
            Ok(())
        }

        fn start_listening(&mut self) {
            self.listening = true;
        }

        fn stop_listening(&mut self) {
            self.listening = false;
        }

        fn write(&mut self, payload: &[u8]) -> Result<(), ()> {
            let mut echo = [0u8; PACKET_LEN];
            echo.copy_from_slice(&payload[..PACKET_LEN]);
            echo.swap(0, 1);
            self.reply = Some(echo);
            Ok(())
        }

        fn available(&mut self) -> bool {
            self.listening && self.reply.is_some()
        }

        fn read(&mut self, buf: &mut [u8]) -> usize {
            if let Some(reply) = self.reply.take() {
                buf[..PACKET_LEN].copy_from_slice(&reply);
            }
            32
        }
    }

    #[test]
    fn oversized_read_length_is_clamped() {
        let link = RadioLink::new(
            OverReportingRadio::default(),
            MockClock::new(),
            LinkConfig::default(),
        );
        assert_eq!(link.ping(3, 1), Ok(1));
    }

    #[test]
    fn late_echo_within_timeout_confirms() {
        let mut radio = MockTransport::new();
        radio.delay_next(1, 3);
        let link = link(radio);
        assert_eq!(link.ping(3, 5), Ok(1));
        assert_eq!(link.clock().total_slept_ms(), 30);
    }

    #[test]
    fn echo_after_timeout_fails_attempt() {
        let mut radio = MockTransport::new();
        radio.delay_next(1, 1000);
        let link = RadioLink::new(
            radio,
            MockClock::new(),
            LinkConfig::default().with_max_attempts(1),
        );
        assert!(link.ping(3, 5).is_err());
    }

    // =========================================================================
    // Sequence Tests
    // =========================================================================

    #[test]
    fn sequence_sends_bits_in_order_with_spacing() {
        let link = link(MockTransport::new());
        assert_eq!(link.send_sequence(3, 2, &[0, 1, 0]), Ok(3));

        let written = link.with_transport(|r| r.written());
        assert_eq!(
            written,
            vec![
                [0, 3, 0xA4, 2, 0],
                [0, 3, 0xA4, 2, 1],
                [0, 3, 0xA4, 2, 0],
            ]
        );
        assert_eq!(link.clock().total_slept_ms(), 1500);
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let link = RadioLink::new(
            MockTransport::new(),
            MockClock::new(),
            LinkConfig::default().with_max_attempts(2),
        );
        link.send_sequence(3, 2, &[0]).unwrap();
        link.with_transport(|r| r.set_all_offline(true));

        let err = link.send_sequence(3, 2, &[0, 1, 0]).unwrap_err();
        assert!(matches!(
            err,
            LinkError::SequenceAborted {
                receiver: 3,
                confirmed: 0,
                total: 3,
                ..
            }
        ));
        // 1 from the first sequence + 2 attempts on the aborted packet
        assert_eq!(link.with_transport(|r| r.write_count()), 3);
    }

    #[test]
    fn sequence_reports_confirmed_prefix() {
        let mut radio = MockTransport::new();
        // First echo arrives, the second packet loses both of its echoes
        radio.queue_faults(&[ReplyFault::Delay(0), ReplyFault::Drop, ReplyFault::Drop]);
        let link = RadioLink::new(
            radio,
            MockClock::new(),
            LinkConfig::default().with_max_attempts(2),
        );

        let err = link.send_sequence(4, 2, &[0, 1, 0]).unwrap_err();
        match err {
            LinkError::SequenceAborted {
                confirmed, cause, ..
            } => {
                assert_eq!(confirmed, 1);
                assert!(matches!(*cause, LinkError::NotConfirmed { attempts: 2, .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    // =========================================================================
    // Helper Tests
    // =========================================================================

    #[test]
    fn helpers_use_matching_commands() {
        let link = link(MockTransport::new());
        link.ping(3, 42).unwrap();
        link.set_pin_mode(3, 2, true).unwrap();
        link.digital_write(3, 2, false).unwrap();
        link.analog_write(3, 5, 128).unwrap();
        link.request_voltage(3).unwrap();

        let written = link.with_transport(|r| r.written());
        assert_eq!(
            written,
            vec![
                [0, 3, 0xA1, 42, 0],
                [0, 3, 0xA2, 2, 1],
                [0, 3, 0xA4, 2, 0],
                [0, 3, 0xA6, 5, 128],
                [0, 3, 0xA7, 0, 0],
            ]
        );
    }

    #[test]
    fn begin_applies_radio_config() {
        let radio = RadioConfig::default().with_channel(0x10);
        let link = link(MockTransport::new()).with_radio_config(radio);
        link.begin().unwrap();
        assert_eq!(link.with_transport(|r| r.begun_with), Some(radio));
    }
}
