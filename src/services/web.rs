//! Axum-based HTTP server for the hub API.
//!
//! Provides REST endpoints for:
//! - GET `/api/hub` - All devices, pins, states and schedules
//! - GET `/api/devices/{id}` - One device
//! - POST `/api/configure` - Form-encoded configuration request
//! - POST `/api/devices/{id}/pins/{pin}/state` - Switch one pin
//!
//! Radio work blocks for up to a few seconds while holding the hub lock, so
//! every handler that takes the lock runs on the blocking thread pool.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::WebConfig;
use crate::error::HubError;
use crate::hub::{DeviceSnapshot, HubSnapshot};
use crate::pin::PinState;
use crate::request::ConfigRequest;
use crate::traits::{Clock, Transport};

use super::api::{error_chain, ApiResponse, ConfigureResponse, SetStateRequest, StateChangeResponse};
use super::shared::SharedHub;

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

// ============================================================================
// Error Mapping
// ============================================================================

/// HTTP status for a hub error.
///
/// | Error | Status |
/// |-------|--------|
/// | device or pin not found | 404 |
/// | malformed request | 400 |
/// | input pin, half-set schedule | 422 |
/// | board did not confirm | 502 |
pub fn status_for(err: &HubError) -> StatusCode {
    match err {
        HubError::DeviceNotFound(_) | HubError::PinNotFound { .. } => StatusCode::NOT_FOUND,
        HubError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        HubError::UnsupportedOperation { .. } | HubError::InvalidSchedule { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        HubError::TransmissionFailed(_) => StatusCode::BAD_GATEWAY,
        HubError::DuplicateDevice(_) | HubError::DuplicatePin { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_reply<T>(err: &HubError) -> Reply<T> {
    (status_for(err), Json(ApiResponse::err(error_chain(err))))
}

fn ok_reply<T>(data: T) -> Reply<T> {
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

fn worker_failed<T>(err: tokio::task::JoinError) -> Reply<T> {
    tracing::error!(error = %err, "radio worker failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::err("radio worker failed")),
    )
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/hub - Returns every device and pin
///
/// The hub lock can be held for seconds by a radio exchange, so even reads
/// wait for it on the blocking pool.
async fn get_hub<T, C>(State(hub): State<Arc<SharedHub<T, C>>>) -> Reply<HubSnapshot>
where
    T: Transport + Send + 'static,
    C: Clock + Send + Sync + 'static,
{
    match tokio::task::spawn_blocking(move || hub.snapshot()).await {
        Ok(snapshot) => ok_reply(snapshot),
        Err(err) => worker_failed(err),
    }
}

/// GET /api/devices/{id} - Returns one device
async fn get_device<T, C>(
    State(hub): State<Arc<SharedHub<T, C>>>,
    Path(id): Path<u8>,
) -> Reply<DeviceSnapshot>
where
    T: Transport + Send + 'static,
    C: Clock + Send + Sync + 'static,
{
    match tokio::task::spawn_blocking(move || hub.device_snapshot(id)).await {
        Ok(Ok(device)) => ok_reply(device),
        Ok(Err(err)) => error_reply(&err),
        Err(err) => worker_failed(err),
    }
}

/// POST /api/configure - Apply a configuration form
///
/// Accepts `application/x-www-form-urlencoded`:
/// `deviceId=3&2:state=1&3:onAt=18:40&3:offAt=18:41`
async fn configure<T, C>(
    State(hub): State<Arc<SharedHub<T, C>>>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Reply<ConfigureResponse>
where
    T: Transport + Send + 'static,
    C: Clock + Send + Sync + 'static,
{
    let request = match ConfigRequest::from_pairs(pairs) {
        Ok(request) => request,
        Err(err) => return error_reply(&HubError::from(err)),
    };
    if request.is_discard() {
        return ok_reply(ConfigureResponse::discarded());
    }

    let result = tokio::task::spawn_blocking(move || hub.with_hub(|hub| hub.apply(&request))).await;
    match result {
        Ok(Ok(Some(report))) => {
            let response = ConfigureResponse::from(&report);
            if report.is_success() {
                ok_reply(response)
            } else {
                let pins: Vec<String> = response.failed.iter().map(|f| f.pin.to_string()).collect();
                let message = format!("state change failed for pin(s) {}", pins.join(", "));
                (StatusCode::BAD_GATEWAY, Json(ApiResponse::partial(response, message)))
            }
        }
        Ok(Ok(None)) => ok_reply(ConfigureResponse::discarded()),
        Ok(Err(err)) => error_reply(&err),
        Err(err) => worker_failed(err),
    }
}

/// POST /api/devices/{id}/pins/{pin}/state - Switch one pin
///
/// Accepts JSON: `{"state": 1}`
async fn set_pin_state<T, C>(
    State(hub): State<Arc<SharedHub<T, C>>>,
    Path((device, pin)): Path<(u8, u8)>,
    Json(body): Json<SetStateRequest>,
) -> Reply<StateChangeResponse>
where
    T: Transport + Send + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Some(target) = PinState::from_bit(body.state) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err("state must be 0 or 1")),
        );
    };

    let result =
        tokio::task::spawn_blocking(move || hub.with_hub(|hub| hub.set_pin_state(device, pin, target))).await;
    match result {
        Ok(Ok(change)) => ok_reply(StateChangeResponse::new(device, pin, target, change)),
        Ok(Err(err)) => error_reply(&err),
        Err(err) => worker_failed(err),
    }
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err("Not found")),
    )
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self::from_config(&WebConfig::default())
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Create from shared WebConfig
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
            cors_permissive: config.cors_permissive,
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router<T, C>(hub: Arc<SharedHub<T, C>>, config: &WebServerConfig) -> Router
where
    T: Transport + Send + 'static,
    C: Clock + Send + Sync + 'static,
{
    let mut router = Router::new()
        .route("/api/hub", get(get_hub::<T, C>))
        .route("/api/devices/:id", get(get_device::<T, C>))
        .route("/api/configure", post(configure::<T, C>))
        .route("/api/devices/:id/pins/:pin/state", post(set_pin_state::<T, C>))
        .fallback(not_found)
        .with_state(hub);

    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Start the web server with shared state
///
/// Runs until the listener fails. Share the same `SharedHub` with the
/// [`ScheduleTicker`](super::ScheduleTicker).
pub async fn run_server<T, C>(hub: Arc<SharedHub<T, C>>, config: WebServerConfig) -> Result<(), std::io::Error>
where
    T: Transport + Send + 'static,
    C: Clock + Send + Sync + 'static,
{
    let router = build_router(hub, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "web server listening");

    axum::serve(listener, router).await
}
