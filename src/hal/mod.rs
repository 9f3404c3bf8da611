//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: Simulated radio and clock for tests and desktop development
//! - `null`: No-hardware radio stand-in and the real system clock
//!
//! A real radio driver lives outside this crate and implements
//! [`Transport`](crate::traits::Transport) directly.

/// Simulated radio and clock.
pub mod mock;
/// No-hardware radio and the system clock.
pub mod null;

pub use mock::*;
pub use null::*;
