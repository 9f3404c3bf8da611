//! Services that run around the hub: the HTTP API and the schedule ticker.
//!
//! Both share one [`SharedHub`] wrapped in `Arc`, so web requests and
//! scheduler ticks see the same devices and take turns on the radio:
//!
//! ```ignore
//! use std::sync::Arc;
//! use rf_switch_hub::services::{build_router, ScheduleTicker, SharedHub, WebServerConfig};
//!
//! let shared = Arc::new(SharedHub::new(hub));
//!
//! let _ticker = ScheduleTicker::spawn(Arc::clone(&shared), config.scheduler)?;
//! let router = build_router(Arc::clone(&shared), &WebServerConfig::from_config(&config.web));
//! ```

/// Hub shared between services.
pub mod shared;

/// JSON request and response types.
pub mod api;

/// Background schedule evaluation.
pub mod scheduler;

/// Axum router and server.
pub mod web;

// Re-exports
pub use api::*;
pub use scheduler::*;
pub use shared::*;
pub use web::*;
