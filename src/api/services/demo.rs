//! Demo application endpoints
//!
//! Minimal business handlers used to exercise the telemetry middleware:
//! a JSON index, a slow endpoint, a failing endpoint and a templated route.

use actix_web::{HttpResponse, Responder, web};
use rand::RngExt;
use serde_json::json;
use tokio::time::{Duration, sleep};

pub struct DemoService;

impl DemoService {
    pub async fn index() -> impl Responder {
        HttpResponse::Ok().json(json!({
            "message": "httpulse is running.",
            "endpoints": {
                "/": "This info",
                "/slow": "Simulates a slow request (0-2s)",
                "/error": "Returns a server error (500)",
                "/users/{id}": "Templated route example",
                "/metrics": "Prometheus metrics",
            },
        }))
    }

    /// Sleeps between 0 and 2 seconds to populate the latency histogram.
    pub async fn slow() -> impl Responder {
        let delay_ms = rand::rng().random_range(0..2000u64);
        sleep(Duration::from_millis(delay_ms)).await;
        HttpResponse::Ok().json(json!({
            "message": "Slow request completed",
            "delay_ms": delay_ms,
        }))
    }

    pub async fn error() -> impl Responder {
        HttpResponse::InternalServerError().json(json!({
            "error": "Something went wrong! (simulated)",
        }))
    }

    pub async fn user_detail(path: web::Path<String>) -> impl Responder {
        let id = path.into_inner();
        HttpResponse::Ok().json(json!({ "id": id }))
    }
}
