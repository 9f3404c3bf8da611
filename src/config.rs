//! Configuration for the hub, its radio link and its fleet of edge devices.
//!
//! Names use `heapless::String` so the structs stay fixed-size, and every
//! struct has `with_*` builders for code-side configuration. With the `serde`
//! feature the whole tree can be loaded from a file.
//!
//! # Example
//!
//! ```rust
//! use rf_switch_hub::config::{DeviceConfig, HubConfig, LinkConfig, PinConfig};
//! use rf_switch_hub::PinKind;
//!
//! let config = HubConfig::default()
//!     .with_name("Garden")
//!     .with_link(LinkConfig::default().with_max_attempts(8))
//!     .with_device(
//!         DeviceConfig::new(7, "pump")
//!             .with_pins(vec![PinConfig::new(4, PinKind::ToggleSwitch)]),
//!     );
//!
//! assert_eq!(config.link.max_attempts, 8);
//! assert_eq!(config.devices[0].pins[0].id, 4);
//! ```

use heapless::String as HString;

use crate::pin::PinKind;
use crate::time::TimeOfDay;
use crate::traits::PipeAddress;

/// Maximum length for hub, device and pin names
pub const MAX_SHORT_STRING: usize = 64;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let valid_end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= MAX_SHORT_STRING)
        .last()
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete hub configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HubConfig {
    /// Human-readable hub name
    pub name: ShortString,
    /// Retry and timing policy for radio commands
    pub link: LinkConfig,
    /// Radio chip settings and base pipe addresses
    pub radio: RadioConfig,
    /// Schedule ticker settings
    pub scheduler: SchedulerConfig,
    /// Web API settings
    pub web: WebConfig,
    /// Edge devices, in registration order
    pub devices: Vec<DeviceConfig>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: short_string("Switch controller hub"),
            link: LinkConfig::default(),
            radio: RadioConfig::default(),
            scheduler: SchedulerConfig::default(),
            web: WebConfig::default(),
            devices: Vec::new(),
        }
    }
}

impl HubConfig {
    /// Two demo boards (`abc` = 3, `xyz` = 4) with the default pin layout.
    pub fn demo() -> Self {
        Self::default()
            .with_device(DeviceConfig::new(3, "abc"))
            .with_device(DeviceConfig::new(4, "xyz"))
    }

    /// Set the hub name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set link configuration
    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }

    /// Set radio configuration
    pub fn with_radio(mut self, radio: RadioConfig) -> Self {
        self.radio = radio;
        self
    }

    /// Set scheduler configuration
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Append a device
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.devices.push(device);
        self
    }

    /// Parse a TOML document. Missing sections take their defaults.
    ///
    /// ```
    /// use rf_switch_hub::config::HubConfig;
    ///
    /// let config = HubConfig::from_toml(r#"
    ///     name = "garden"
    ///
    ///     [[devices]]
    ///     id = 5
    ///     name = "pump"
    /// "#).unwrap();
    /// assert_eq!(config.devices[0].pins.len(), 2);
    /// ```
    #[cfg(feature = "web")]
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

// ============================================================================
// Link Config
// ============================================================================

/// Retry and timing policy for confirmed radio commands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// Sender id the hub puts in every packet
    pub hub_address: u8,
    /// Attempts per packet before giving up (0 sends nothing and fails)
    pub max_attempts: u8,
    /// How long to wait for the echo after each transmit
    pub attempt_timeout_ms: u32,
    /// Pause between a failed attempt and the next one
    pub pause_between_attempts_ms: u32,
    /// Sleep between `available()` polls while waiting for an echo
    pub poll_interval_ms: u32,
    /// Gap after each packet of a multi-packet sequence, so the board can act
    pub message_spacing_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            hub_address: 0,
            max_attempts: 5,
            attempt_timeout_ms: 100,
            pause_between_attempts_ms: 50,
            poll_interval_ms: 10,
            message_spacing_ms: 500,
        }
    }
}

impl LinkConfig {
    /// Set the hub's sender id
    pub fn with_hub_address(mut self, address: u8) -> Self {
        self.hub_address = address;
        self
    }

    /// Set the attempt budget
    pub fn with_max_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the per-attempt echo timeout
    pub fn with_attempt_timeout_ms(mut self, ms: u32) -> Self {
        self.attempt_timeout_ms = ms;
        self
    }

    /// Set the pause between failed attempts
    pub fn with_pause_between_attempts_ms(mut self, ms: u32) -> Self {
        self.pause_between_attempts_ms = ms;
        self
    }

    /// Set the receive poll interval
    pub fn with_poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the gap between packets of a sequence
    pub fn with_message_spacing_ms(mut self, ms: u32) -> Self {
        self.message_spacing_ms = ms;
        self
    }
}

// ============================================================================
// Radio Config
// ============================================================================

/// Air data rate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DataRate {
    /// 250 kbps, longest range
    #[default]
    Kbps250,
    /// 1 Mbps
    Mbps1,
    /// 2 Mbps
    Mbps2,
}

/// Transmit power amplifier level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PaLevel {
    /// Minimum power
    Min,
    /// Low power
    Low,
    /// High power
    High,
    /// Maximum power
    #[default]
    Max,
}

/// Hardware CRC length
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CrcLength {
    /// CRC disabled
    Disabled,
    /// 8-bit CRC
    #[default]
    Bits8,
    /// 16-bit CRC
    Bits16,
}

/// Radio chip settings, applied once by [`Transport::begin`].
///
/// Defaults match the edge-device firmware: channel `0x78`, 250 kbps, max
/// power, 8-bit CRC, 15 hardware retransmits at the longest delay.
///
/// [`Transport::begin`]: crate::traits::Transport::begin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RadioConfig {
    /// RF channel
    pub channel: u8,
    /// Air data rate
    pub data_rate: DataRate,
    /// Transmit power
    pub pa_level: PaLevel,
    /// Hardware CRC length
    pub crc: CrcLength,
    /// Hardware auto-retransmit delay step (0–15)
    pub retry_delay: u8,
    /// Hardware auto-retransmit count (0–15)
    pub retry_count: u8,
    /// Hardware auto-acknowledge
    pub auto_ack: bool,
    /// Dynamic payload length
    pub dynamic_payloads: bool,
    /// Base address for outbound pipes; offset by receiver id
    pub write_base: PipeAddress,
    /// Base address for reply pipes; offset by receiver id
    pub read_base: PipeAddress,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            channel: 0x78,
            data_rate: DataRate::Kbps250,
            pa_level: PaLevel::Max,
            crc: CrcLength::Bits8,
            retry_delay: 15,
            retry_count: 15,
            auto_ack: true,
            dynamic_payloads: true,
            write_base: PipeAddress::new([0xE8, 0xE8, 0xF0, 0xF0, 0xE1]),
            read_base: PipeAddress::new([0xAB, 0xCD, 0xAB, 0xCD, 0x71]),
        }
    }
}

impl RadioConfig {
    /// Set the RF channel
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Set the data rate
    pub fn with_data_rate(mut self, rate: DataRate) -> Self {
        self.data_rate = rate;
        self
    }

    /// Set the power level
    pub fn with_pa_level(mut self, level: PaLevel) -> Self {
        self.pa_level = level;
        self
    }

    /// Set hardware retransmit delay and count, each clamped to 0–15
    pub fn with_retries(mut self, delay: u8, count: u8) -> Self {
        self.retry_delay = delay.min(15);
        self.retry_count = count.min(15);
        self
    }

    /// Set both base pipe addresses
    pub fn with_base_addresses(mut self, write: PipeAddress, read: PipeAddress) -> Self {
        self.write_base = write;
        self.read_base = read;
        self
    }
}

// ============================================================================
// Scheduler Config
// ============================================================================

/// Schedule ticker configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// Interval between schedule evaluations. Keep under a minute or
    /// transitions can be skipped.
    pub tick_interval_ms: u32,
    /// Whether the ticker runs at all
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 15_000,
            enabled: true,
        }
    }
}

impl SchedulerConfig {
    /// Set the tick interval
    pub fn with_tick_interval_ms(mut self, ms: u32) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Enable or disable the ticker
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// True if every minute of the day gets at least one evaluation.
    pub fn covers_every_minute(&self) -> bool {
        self.tick_interval_ms > 0 && self.tick_interval_ms < 60_000
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// Web server configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
    /// Whether web server is enabled
    pub enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8090,
            cors_permissive: true,
            enabled: true,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Enable or disable web server
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// One edge device and its pins
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// Board id; must match the id flashed into the firmware
    pub id: u8,
    /// Human-readable device name
    pub name: ShortString,
    /// Pins exposed by this board
    #[cfg_attr(feature = "serde", serde(default = "default_pins"))]
    pub pins: Vec<PinConfig>,
}

/// Pin 2 as a momentary switch, pin 3 as a toggle switch.
pub fn default_pins() -> Vec<PinConfig> {
    vec![
        PinConfig::new(2, PinKind::MomentarySwitch),
        PinConfig::new(3, PinKind::ToggleSwitch),
    ]
}

impl DeviceConfig {
    /// Device with the default pin layout
    pub fn new(id: u8, name: &str) -> Self {
        Self {
            id,
            name: short_string(name),
            pins: default_pins(),
        }
    }

    /// Replace the pin list
    pub fn with_pins(mut self, pins: Vec<PinConfig>) -> Self {
        self.pins = pins;
        self
    }

    /// Append a pin
    pub fn with_pin(mut self, pin: PinConfig) -> Self {
        self.pins.push(pin);
        self
    }
}

// ============================================================================
// Pin Config
// ============================================================================

/// One pin and its optional start-up schedule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PinConfig {
    /// Pin id on the board
    pub id: u8,
    /// What the pin drives or reads
    pub kind: PinKind,
    /// Daily switch-on time
    #[cfg_attr(feature = "serde", serde(default))]
    pub on_at: Option<TimeOfDay>,
    /// Daily switch-off time
    #[cfg_attr(feature = "serde", serde(default))]
    pub off_at: Option<TimeOfDay>,
}

impl PinConfig {
    /// Pin without a schedule
    pub fn new(id: u8, kind: PinKind) -> Self {
        Self {
            id,
            kind,
            on_at: None,
            off_at: None,
        }
    }

    /// Set a daily schedule
    pub fn with_schedule(mut self, on_at: TimeOfDay, off_at: TimeOfDay) -> Self {
        self.on_at = Some(on_at);
        self.off_at = Some(off_at);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
