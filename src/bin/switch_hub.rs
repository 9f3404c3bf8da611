//! Switch hub server: web API plus schedule ticker.
//!
//! # Usage
//!
//! ```sh
//! cargo run --bin switch_hub --features web
//! ```
//!
//! # Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `SWITCH_HUB_CONFIG` | Path to a TOML config; the two demo boards otherwise |
//! | `SWITCH_HUB_SIMULATE` | `1` to answer every command with a simulated board (demos only) |
//! | `RUST_LOG` | Log filter, `info` by default |
//!
//! No radio driver ships with this crate. Without simulation the hub runs
//! with the null radio: schedules and the API work, every command reports a
//! transmission failure.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rf_switch_hub::config::HubConfig;
use rf_switch_hub::hal::{MockTransport, NullTransport, SystemClock};
use rf_switch_hub::services::{run_server, ScheduleTicker, SharedHub, WebServerConfig};
use rf_switch_hub::traits::Transport;
use rf_switch_hub::ControlHub;

fn load_config() -> anyhow::Result<HubConfig> {
    match std::env::var_os("SWITCH_HUB_CONFIG") {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.to_string_lossy()))?;
            HubConfig::from_toml(&text).with_context(|| format!("parsing {}", path.to_string_lossy()))
        }
        None => {
            tracing::info!("SWITCH_HUB_CONFIG not set, using demo devices");
            Ok(HubConfig::demo())
        }
    }
}

async fn serve<T>(config: HubConfig, transport: T) -> anyhow::Result<()>
where
    T: Transport + Send + 'static,
{
    let hub = ControlHub::from_config(&config, transport, SystemClock::new())
        .context("invalid hub configuration")?;
    if let Err(err) = hub.link().begin() {
        tracing::warn!(error = %err, "radio start-up failed, continuing");
    }
    print!("{}", hub.report());

    let shared = Arc::new(SharedHub::new(hub));

    let _ticker = if config.scheduler.enabled {
        Some(ScheduleTicker::spawn(Arc::clone(&shared), config.scheduler).context("starting schedule ticker")?)
    } else {
        tracing::info!("schedule ticker disabled");
        None
    };

    if config.web.enabled {
        run_server(shared, WebServerConfig::from_config(&config.web))
            .await
            .context("web server")?;
    } else {
        tracing::info!("web server disabled, press Ctrl+C to stop");
        tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let simulate = std::env::var("SWITCH_HUB_SIMULATE").is_ok_and(|v| v == "1");

    if simulate {
        tracing::info!("simulated boards enabled");
        serve(config, MockTransport::new()).await
    } else {
        serve(config, NullTransport::new()).await
    }
}
