//! Process-level metrics collection
//!
//! Uptime, memory and CPU time gauges for the server process, collected
//! with sysinfo. A background task refreshes them periodically and the
//! snapshot endpoint refreshes them again right before rendering, so a
//! scrape never sees values older than one collection interval.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::time::{Duration, interval};
use tracing::warn;

use super::registry::Registry;
use super::series::Gauge;
use crate::errors::Result;

/// Cached system handle; refreshing only touches the current process.
static SYSTEM: Lazy<Mutex<System>> = Lazy::new(|| Mutex::new(System::new()));

/// Background refresh interval
const UPDATE_INTERVAL_SECS: u64 = 15;

pub struct ProcessMetrics {
    pub uptime_seconds: Arc<Gauge>,
    pub memory_bytes: Arc<Gauge>,
    pub cpu_seconds: Arc<Gauge>,
    started_at: DateTime<Utc>,
}

impl ProcessMetrics {
    /// Create and register the process gauges, anchored to the current time
    /// as the process start.
    pub fn register(registry: &Registry) -> Result<Self> {
        let uptime_seconds = Arc::new(Gauge::new(
            "uptime_seconds",
            "Server uptime in seconds",
            &[],
        ));
        registry.register(uptime_seconds.clone())?;

        let memory_bytes = Arc::new(Gauge::new(
            "process_memory_bytes",
            "Memory usage of the server process by kind (rss, virtual)",
            &["kind"],
        ));
        registry.register(memory_bytes.clone())?;

        let cpu_seconds = Arc::new(Gauge::new(
            "process_cpu_seconds",
            "Accumulated CPU time of the server process in seconds",
            &[],
        ));
        registry.register(cpu_seconds.clone())?;

        Ok(Self {
            uptime_seconds,
            memory_bytes,
            cpu_seconds,
            started_at: Utc::now(),
        })
    }

    /// Refresh all process gauges from the current system state.
    pub fn refresh(&self) {
        let uptime = (Utc::now() - self.started_at).num_seconds().max(0) as f64;
        self.uptime_seconds.set(&[], uptime);

        let pid = Pid::from_u32(std::process::id());

        let mut sys = match SYSTEM.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Process metrics mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        if let Some(process) = sys.process(pid) {
            self.memory_bytes
                .set(&[("kind", "rss")], process.memory() as f64);
            self.memory_bytes
                .set(&[("kind", "virtual")], process.virtual_memory() as f64);

            // accumulated_cpu_time reports milliseconds
            self.cpu_seconds
                .set(&[], process.accumulated_cpu_time() as f64 / 1000.0);
        }
    }
}

/// Spawn a background task that periodically refreshes the process gauges.
///
/// Should be called once during server startup.
pub fn spawn_process_metrics_updater(metrics: Arc<ProcessMetrics>) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(UPDATE_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            metrics.refresh();
        }
    });
}
