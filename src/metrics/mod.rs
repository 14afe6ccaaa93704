//! Metrics collection and Prometheus exposition
//!
//! The unit of shared mutable state is a single metric family (`Counter`,
//! `Histogram`, `Gauge`); families are grouped in a [`Registry`] which
//! renders the pull-based text snapshot. Route labels are bounded by
//! [`normalize_route`] so an unbounded set of request paths never explodes
//! series cardinality.

mod http;
mod process;
mod registry;
mod route;
mod series;

pub use http::HttpMetrics;
pub use process::{ProcessMetrics, spawn_process_metrics_updater};
pub use registry::{Collect, Registry};
pub use route::normalize_route;
pub use series::{Counter, Gauge, Histogram, HistogramTimer, LabelPairs, MetricDesc, MetricKind};
