//! HTTP request metrics
//!
//! The series mutated by the telemetry middleware: request counts and
//! latency distributions labeled by method, normalized route and status
//! code, plus the unlabeled in-flight gauge.

use std::sync::Arc;

use super::registry::Registry;
use super::series::{Counter, Gauge, Histogram};
use crate::errors::Result;

/// Latency bucket bounds in seconds.
pub const DURATION_BUCKETS: [f64; 8] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0, 5.0];

const REQUEST_LABELS: [&str; 3] = ["method", "route", "status_code"];

pub struct HttpMetrics {
    /// Total number of HTTP requests by method, route and status code.
    pub requests_total: Arc<Counter>,
    /// Request duration distribution, same labels as `requests_total`.
    pub request_duration_seconds: Arc<Histogram>,
    /// Number of requests currently in flight.
    pub active_requests: Arc<Gauge>,
}

impl HttpMetrics {
    /// Create the HTTP metric families and register them. Duplicate names
    /// fail registration, which is fatal at startup.
    pub fn register(registry: &Registry) -> Result<Self> {
        let requests_total = Arc::new(Counter::new(
            "http_requests_total",
            "Total number of HTTP requests",
            &REQUEST_LABELS,
        ));
        registry.register(requests_total.clone())?;

        let request_duration_seconds = Arc::new(Histogram::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            &REQUEST_LABELS,
            &DURATION_BUCKETS,
        ));
        registry.register(request_duration_seconds.clone())?;

        let active_requests = Arc::new(Gauge::new(
            "http_active_requests",
            "Number of in-flight HTTP requests",
            &[],
        ));
        registry.register(active_requests.clone())?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            active_requests,
        })
    }
}
