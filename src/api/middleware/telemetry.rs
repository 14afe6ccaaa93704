//! Request telemetry middleware
//!
//! Wraps every inbound request: increments the in-flight gauge, times the
//! request, and on completion records count and duration observations
//! labeled by method, normalized route and status code. Completion fires
//! exactly once on every exit path, including handler errors and client
//! disconnects.

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::metrics::{Gauge, HttpMetrics, normalize_route};

/// Middleware factory. Dependencies are explicit: the metric handles and
/// the scrape path are supplied at construction, there is no global lookup.
pub struct RequestTelemetry {
    metrics: Arc<HttpMetrics>,
    metrics_path: String,
}

impl RequestTelemetry {
    pub fn new(metrics: Arc<HttpMetrics>, metrics_path: impl Into<String>) -> Self {
        Self {
            metrics,
            metrics_path: metrics_path.into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestTelemetry
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestTelemetryService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTelemetryService {
            service: Rc::new(service),
            metrics: self.metrics.clone(),
            metrics_path: self.metrics_path.clone(),
        }))
    }
}

pub struct RequestTelemetryService<S> {
    service: Rc<S>,
    metrics: Arc<HttpMetrics>,
    metrics_path: String,
}

/// Drop guard that decrements the in-flight gauge. The future owning it is
/// dropped on success, handler error, panic unwind and client disconnect
/// alike, so the gauge can never leak.
struct InFlightGuard {
    gauge: Arc<Gauge>,
}

impl InFlightGuard {
    fn acquire(gauge: Arc<Gauge>) -> Self {
        gauge.inc(&[]);
        Self { gauge }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec(&[]);
    }
}

impl<S, B> Service<ServiceRequest> for RequestTelemetryService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        // Requests to the scrape endpoint are not measured, so a scrape
        // never pollutes its own output.
        if req.path() == self.metrics_path {
            return Box::pin(async move { srv.call(req).await });
        }

        let metrics = self.metrics.clone();
        let method = method_str(req.method());
        let path = req.path().to_string();

        Box::pin(async move {
            let _guard = InFlightGuard::acquire(metrics.active_requests.clone());
            let mut timer = metrics
                .request_duration_seconds
                .start_timer(&[("method", method)]);

            let result = srv.call(req).await;

            let (route, status) = match &result {
                Ok(response) => {
                    // A template resolved by the router ("/users/{id}") is the
                    // most precise low-cardinality label; fall back to path
                    // normalization otherwise.
                    let route = response
                        .request()
                        .match_pattern()
                        .unwrap_or_else(|| normalize_route(&path).to_string());
                    (route, response.status().as_u16())
                }
                Err(err) => (
                    normalize_route(&path).to_string(),
                    err.as_response_error().status_code().as_u16(),
                ),
            };
            let status = status.to_string();
            let labels = [
                ("method", method),
                ("route", route.as_str()),
                ("status_code", status.as_str()),
            ];

            metrics.requests_total.inc(&labels);
            timer.stop(&labels);

            result
        })
    }
}

/// Map HTTP method to a static string (avoids allocation).
fn method_str(method: &actix_web::http::Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        "PATCH" => "PATCH",
        _ => "OTHER",
    }
}
