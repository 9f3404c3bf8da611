//! Trait definitions for hardware abstraction.
//!
//! This module defines the seams that let the hub run against a real radio,
//! a simulated one in tests, or no radio at all.
//!
//! - [`Transport`]: half-duplex packet radio with addressed pipes
//! - [`Clock`]: millisecond time source that can also block
//! - [`PipeAddress`]: 5-byte pipe address value

/// Radio transport and clock traits.
pub mod hardware;

pub use hardware::*;
