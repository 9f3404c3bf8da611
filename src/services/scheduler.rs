//! Background thread that drives the schedules.
//!
//! [`ScheduleTicker`] calls [`SharedHub::refresh_schedules`] right away and
//! then every `tick_interval_ms`. Schedules match on the exact minute, so the
//! interval has to stay below 60 s or some minutes are never seen.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::time::TimeOfDay;
use crate::traits::{Clock, Transport};

use super::shared::SharedHub;

/// Handle to the running ticker thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct ScheduleTicker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduleTicker {
    /// Start ticking with the local wall-clock time.
    pub fn spawn<T, C>(hub: Arc<SharedHub<T, C>>, config: SchedulerConfig) -> io::Result<Self>
    where
        T: Transport + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        Self::spawn_with_clock(hub, config, TimeOfDay::now_local)
    }

    /// Start ticking with a custom time source.
    pub fn spawn_with_clock<T, C, F>(
        hub: Arc<SharedHub<T, C>>,
        config: SchedulerConfig,
        mut now: F,
    ) -> io::Result<Self>
    where
        T: Transport + Send + 'static,
        C: Clock + Send + Sync + 'static,
        F: FnMut() -> TimeOfDay + Send + 'static,
    {
        if !config.covers_every_minute() {
            tracing::warn!(
                tick_interval_ms = config.tick_interval_ms,
                "tick interval of a minute or more can miss scheduled transitions"
            );
        }
        let interval = Duration::from_millis(u64::from(config.tick_interval_ms.max(1)));
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("schedule-ticker".into())
            .spawn(move || {
                tracing::info!(interval_ms = interval.as_millis() as u64, "schedule ticker started");
                loop {
                    let now = now();
                    let events = hub.refresh_schedules(now);
                    if !events.is_empty() {
                        tracing::debug!(%now, fired = events.len(), "schedule tick");
                    }
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::info!("schedule ticker stopped");
            })?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to finish its current tick.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ScheduleTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
