//! Prometheus metrics endpoint
//!
//! Exposes the registry snapshot in Prometheus text format.

use actix_web::{HttpResponse, Responder, web};
use std::sync::Arc;

use crate::metrics::{ProcessMetrics, Registry};

/// Media type of the Prometheus text exposition format.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Metrics service handler
pub struct MetricsService;

impl MetricsService {
    /// Handle a scrape: refresh the process gauges, then render the
    /// registry. Rendering reads atomics only and never blocks writers.
    pub async fn snapshot(
        registry: web::Data<Arc<Registry>>,
        process_metrics: web::Data<Arc<ProcessMetrics>>,
    ) -> impl Responder {
        process_metrics.refresh();

        HttpResponse::Ok()
            .content_type(EXPOSITION_CONTENT_TYPE)
            .body(registry.snapshot())
    }
}
