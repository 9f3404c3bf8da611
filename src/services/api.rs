//! API request and response types for the HTTP interface.

use serde::{Deserialize, Serialize};

use crate::device::ConfigureReport;
use crate::pin::{PinState, StateChange};

// ============================================================================
// Response Types
// ============================================================================

/// API response wrapper for consistent JSON structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present when success=true, and for partial failures)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present when success=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Create an error response that still carries data
    pub fn partial(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message.into()),
        }
    }
}

/// A pin whose state was switched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchedPin {
    /// Pin id
    pub pin: u8,
    /// Committed state, 0 or 1
    pub state: u8,
}

/// A pin whose state change failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPin {
    /// Pin id
    pub pin: u8,
    /// Why it failed
    pub error: String,
}

/// Result of `POST /api/configure`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureResponse {
    /// True when the request was `deviceId=-1`
    pub discarded: bool,
    /// Target device (absent when discarded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<u8>,
    /// Pins whose schedule was replaced
    pub schedules_updated: Vec<u8>,
    /// Pins switched
    pub switched: Vec<SwitchedPin>,
    /// Pins already in the requested state
    pub unchanged: Vec<u8>,
    /// Pins whose state change failed
    pub failed: Vec<FailedPin>,
}

impl ConfigureResponse {
    /// Response for a discarded request
    pub fn discarded() -> Self {
        Self {
            discarded: true,
            device: None,
            schedules_updated: Vec::new(),
            switched: Vec::new(),
            unchanged: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl From<&ConfigureReport> for ConfigureResponse {
    fn from(report: &ConfigureReport) -> Self {
        Self {
            discarded: false,
            device: Some(report.device),
            schedules_updated: report.schedules_updated.clone(),
            switched: report
                .switched
                .iter()
                .map(|(pin, state)| SwitchedPin {
                    pin: *pin,
                    state: state.bit(),
                })
                .collect(),
            unchanged: report.unchanged.clone(),
            failed: report
                .failed
                .iter()
                .map(|(pin, err)| FailedPin {
                    pin: *pin,
                    error: error_chain(err),
                })
                .collect(),
        }
    }
}

/// Body of `POST /api/devices/{id}/pins/{pin}/state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStateRequest {
    /// Requested state, 0 or 1
    pub state: u8,
}

/// Result of a single pin state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeResponse {
    /// Device id
    pub device: u8,
    /// Pin id
    pub pin: u8,
    /// State after the request, 0 or 1
    pub state: u8,
    /// False when the pin was already in the requested state
    pub changed: bool,
    /// Radio attempts used
    pub attempts: usize,
}

impl StateChangeResponse {
    /// Build from the state machine's outcome
    pub fn new(device: u8, pin: u8, state: PinState, change: StateChange) -> Self {
        let (changed, attempts) = match change {
            StateChange::Unchanged => (false, 0),
            StateChange::Switched { attempts } => (true, attempts),
        };
        Self {
            device,
            pin,
            state: state.bit(),
            changed,
            attempts,
        }
    }
}

/// Render an error and its sources as one line: `outer: inner: root`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
