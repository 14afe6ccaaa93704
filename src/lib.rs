//! Httpulse - an HTTP service instrumented with request-level telemetry
//!
//! This library provides the building blocks for the Httpulse service:
//! metric series primitives, a Prometheus-compatible registry, route
//! normalization, and the instrumentation middleware that ties them to
//! the request lifecycle.
//!
//! # Architecture
//! - `metrics`: counters, histograms, gauges, registry and exposition
//! - `api`: HTTP services and the telemetry middleware
//! - `config`: configuration management
//! - `system`: logging initialization
//! - `errors`: application error types

pub mod api;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod system;
