//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the hardware traits, enabling
//! development and testing on desktop without a radio attached.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockTransport`] | [`Transport`] | Simulated fleet of boards that echo packets |
//! | [`MockClock`] | [`Clock`] | Time that advances only when something sleeps |
//!
//! # Example
//!
//! ```rust
//! use rf_switch_hub::config::LinkConfig;
//! use rf_switch_hub::hal::{MockClock, MockTransport};
//! use rf_switch_hub::RadioLink;
//!
//! let mut radio = MockTransport::new();
//! radio.drop_next(2); // lose the first two echoes
//!
//! let link = RadioLink::new(radio, MockClock::new(), LinkConfig::default());
//! let attempts = link.ping(3, 42).unwrap();
//! assert_eq!(attempts, 3);
//! assert_eq!(link.with_transport(|r| r.write_count()), 3);
//! ```
//!
//! [`Transport`]: crate::traits::Transport
//! [`Clock`]: crate::traits::Clock

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::RadioConfig;
use crate::packet::{Packet, PACKET_LEN};
use crate::traits::{Clock, PipeAddress, Transport};

// ============================================================================
// Transport Mock
// ============================================================================

/// What the simulated board does with its reply to one packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyFault {
    /// The echo is lost.
    Drop,
    /// The echo arrives with its last byte flipped.
    Corrupt,
    /// The echo arrives only after this many `available()` polls.
    Delay(u32),
}

/// Everything the hub did to the radio, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioEvent {
    /// `begin()` applied chip settings.
    Begin,
    /// Outbound pipe opened.
    OpenWritingPipe(PipeAddress),
    /// Reading pipe opened.
    OpenReadingPipe(u8, PipeAddress),
    /// Switched to receive mode.
    StartListening,
    /// Switched to transmit mode.
    StopListening,
    /// Payload transmitted.
    Write([u8; PACKET_LEN]),
}

/// Errors reported by [`MockTransport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockRadioError {
    /// `write()` called while still in listen mode.
    WriteWhileListening,
    /// Write failure injected with [`MockTransport::fail_next_writes`].
    WriteFailed,
}

#[derive(Debug)]
struct PendingReply {
    bytes: [u8; PACKET_LEN],
    polls_left: u32,
}

/// Simulated radio plus the edge-device firmware on the other end.
///
/// Every packet written to an online board is answered with its echo
/// (sender and receiver swapped). Queue [`ReplyFault`]s to lose, corrupt or
/// delay upcoming replies, take single boards offline, or inject arbitrary
/// bytes with [`inject`](Self::inject).
///
/// # Example
///
/// ```rust
/// use rf_switch_hub::hal::{MockTransport, ReplyFault};
/// use rf_switch_hub::traits::Transport;
///
/// let mut radio = MockTransport::new();
/// radio.queue_faults(&[ReplyFault::Corrupt]);
///
/// radio.stop_listening();
/// radio.write(&[0, 3, 0xA4, 2, 1]).unwrap();
/// radio.start_listening();
///
/// let mut buf = [0u8; 5];
/// assert!(radio.available());
/// radio.read(&mut buf);
/// assert_ne!(buf, [3, 0, 0xA4, 2, 1]);
/// ```
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered log of every radio call.
    pub events: Vec<RadioEvent>,
    /// Whether the radio is in receive mode.
    pub listening: bool,
    /// Settings passed to `begin()`, if it was called.
    pub begun_with: Option<RadioConfig>,
    write_pipe: Option<PipeAddress>,
    read_pipe: Option<PipeAddress>,
    faults: VecDeque<ReplyFault>,
    inbox: VecDeque<PendingReply>,
    offline_boards: Vec<u8>,
    all_offline: bool,
    failing_writes: usize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A radio with every board online and answering.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            listening: false,
            begun_with: None,
            write_pipe: None,
            read_pipe: None,
            faults: VecDeque::new(),
            inbox: VecDeque::new(),
            offline_boards: Vec::new(),
            all_offline: false,
            failing_writes: 0,
        }
    }

    /// A radio whose boards never answer.
    pub fn offline() -> Self {
        let mut radio = Self::new();
        radio.all_offline = true;
        radio
    }

    /// Lose the next `n` replies.
    pub fn drop_next(&mut self, n: usize) {
        self.faults.extend(core::iter::repeat(ReplyFault::Drop).take(n));
    }

    /// Corrupt the next `n` replies.
    pub fn corrupt_next(&mut self, n: usize) {
        self.faults
            .extend(core::iter::repeat(ReplyFault::Corrupt).take(n));
    }

    /// Delay the next `n` replies by `polls` calls to `available()` each.
    pub fn delay_next(&mut self, n: usize, polls: u32) {
        self.faults
            .extend(core::iter::repeat(ReplyFault::Delay(polls)).take(n));
    }

    /// Queue an explicit fault sequence, one entry per upcoming reply.
    pub fn queue_faults(&mut self, faults: &[ReplyFault]) {
        self.faults.extend(faults.iter().copied());
    }

    /// Make the next `n` writes fail at the driver level.
    pub fn fail_next_writes(&mut self, n: usize) {
        self.failing_writes = n;
    }

    /// Stop answering for one board id.
    pub fn set_board_offline(&mut self, board: u8) {
        if !self.offline_boards.contains(&board) {
            self.offline_boards.push(board);
        }
    }

    /// Resume answering for one board id.
    pub fn set_board_online(&mut self, board: u8) {
        self.offline_boards.retain(|b| *b != board);
    }

    /// Stop or resume answering for every board.
    pub fn set_all_offline(&mut self, offline: bool) {
        self.all_offline = offline;
    }

    /// Put raw bytes in the receive queue, readable immediately.
    pub fn inject(&mut self, bytes: [u8; PACKET_LEN]) {
        self.inbox.push_back(PendingReply {
            bytes,
            polls_left: 0,
        });
    }

    /// Every payload successfully written, in order.
    pub fn written(&self) -> Vec<[u8; PACKET_LEN]> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RadioEvent::Write(bytes) => Some(*bytes),
                _ => None,
            })
            .collect()
    }

    /// Written payloads decoded as packets (undecodable ones skipped).
    pub fn written_packets(&self) -> Vec<Packet> {
        self.written()
            .into_iter()
            .filter_map(|b| Packet::from_bytes(b).ok())
            .collect()
    }

    /// Number of payloads written.
    pub fn write_count(&self) -> usize {
        self.written().len()
    }

    /// Currently open outbound pipe.
    pub fn write_pipe(&self) -> Option<PipeAddress> {
        self.write_pipe
    }

    /// Currently open reply pipe.
    pub fn read_pipe(&self) -> Option<PipeAddress> {
        self.read_pipe
    }

    /// Forget the event log.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn board_answers(&self, board: u8) -> bool {
        !self.all_offline && !self.offline_boards.contains(&board)
    }
}

impl Transport for MockTransport {
    type Error = MockRadioError;

    fn begin(&mut self, config: &RadioConfig) -> Result<(), MockRadioError> {
        self.begun_with = Some(*config);
        self.events.push(RadioEvent::Begin);
        Ok(())
    }

    fn open_writing_pipe(&mut self, address: PipeAddress) -> Result<(), MockRadioError> {
        self.write_pipe = Some(address);
        self.events.push(RadioEvent::OpenWritingPipe(address));
        Ok(())
    }

    fn open_reading_pipe(&mut self, pipe: u8, address: PipeAddress) -> Result<(), MockRadioError> {
        self.read_pipe = Some(address);
        self.events.push(RadioEvent::OpenReadingPipe(pipe, address));
        Ok(())
    }

    fn start_listening(&mut self) {
        self.listening = true;
        self.events.push(RadioEvent::StartListening);
    }

    fn stop_listening(&mut self) {
        self.listening = false;
        self.events.push(RadioEvent::StopListening);
    }

    fn write(&mut self, payload: &[u8]) -> Result<(), MockRadioError> {
        if self.listening {
            return Err(MockRadioError::WriteWhileListening);
        }
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(MockRadioError::WriteFailed);
        }

        let mut bytes = [0u8; PACKET_LEN];
        let n = payload.len().min(PACKET_LEN);
        bytes[..n].copy_from_slice(&payload[..n]);
        self.events.push(RadioEvent::Write(bytes));

        // Firmware echo: swap sender and receiver
        if !self.board_answers(bytes[1]) {
            return Ok(());
        }
        let mut echo = bytes;
        echo.swap(0, 1);
        match self.faults.pop_front() {
            None => self.inbox.push_back(PendingReply {
                bytes: echo,
                polls_left: 0,
            }),
            Some(ReplyFault::Drop) => {}
            Some(ReplyFault::Corrupt) => {
                echo[PACKET_LEN - 1] ^= 0xFF;
                self.inbox.push_back(PendingReply {
                    bytes: echo,
                    polls_left: 0,
                });
            }
            Some(ReplyFault::Delay(polls)) => self.inbox.push_back(PendingReply {
                bytes: echo,
                polls_left: polls,
            }),
        }
        Ok(())
    }

    fn available(&mut self) -> bool {
        if !self.listening {
            return false;
        }
        match self.inbox.front_mut() {
            Some(reply) if reply.polls_left == 0 => true,
            Some(reply) => {
                reply.polls_left -= 1;
                false
            }
            None => false,
        }
    }

    fn flush_rx(&mut self) {
        // Replies still in flight are not in the queue yet
        while matches!(self.inbox.front(), Some(reply) if reply.polls_left == 0) {
            self.inbox.pop_front();
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        match self.inbox.front() {
            Some(reply) if reply.polls_left == 0 => {
                let n = buf.len().min(PACKET_LEN);
                buf[..n].copy_from_slice(&reply.bytes[..n]);
                self.inbox.pop_front();
                n
            }
            _ => 0,
        }
    }
}

// ============================================================================
// Clock Mock
// ============================================================================

/// Mock clock for testing.
///
/// Time only moves when someone sleeps on it (or a test calls
/// [`advance`](Self::advance)), so retry loops run instantly and
/// deterministically. Safe to share between threads.
///
/// # Example
///
/// ```rust
/// use rf_switch_hub::hal::MockClock;
/// use rf_switch_hub::traits::Clock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.sleep_ms(250);
/// assert_eq!(clock.now_ms(), 250);
///
/// clock.advance(50);
/// assert_eq!(clock.now_ms(), 300);
/// assert_eq!(clock.total_slept_ms(), 250);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: AtomicU64,
    slept_ms: AtomicU64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in milliseconds.
    pub fn set(&self, ms: u64) {
        self.current_ms.store(ms, Ordering::SeqCst);
    }

    /// Advances the clock without counting it as sleep.
    pub fn advance(&self, ms: u64) {
        self.current_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Sum of every `sleep_ms` so far.
    pub fn total_slept_ms(&self) -> u64 {
        self.slept_ms.load(Ordering::SeqCst)
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    fn sleep_ms(&self, ms: u64) {
        self.slept_ms.fetch_add(ms, Ordering::SeqCst);
        self.current_ms.fetch_add(ms, Ordering::SeqCst);
    }
}
