use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tracing::info;

use httpulse::api::middleware::RequestTelemetry;
use httpulse::api::services::{DemoService, MetricsService};
use httpulse::config;
use httpulse::metrics::{HttpMetrics, ProcessMetrics, Registry, spawn_process_metrics_updater};
use httpulse::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    config::init_config();
    let config = config::get_config();

    let _log_guard = init_logging(config);

    // One registry per process, constructed here and handed to every
    // component that needs it.
    let registry = Arc::new(Registry::with_default_labels(&[(
        "app",
        config.telemetry.app_label.as_str(),
    )]));
    let http_metrics =
        Arc::new(HttpMetrics::register(&registry).context("Failed to register HTTP metrics")?);
    let process_metrics = Arc::new(
        ProcessMetrics::register(&registry).context("Failed to register process metrics")?,
    );

    process_metrics.refresh();
    spawn_process_metrics_updater(process_metrics.clone());

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting server at http://{}", bind_address);
    info!(
        "Metrics available at http://{}{}",
        bind_address, config.telemetry.metrics_path
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(process_metrics.clone()))
            .wrap(RequestTelemetry::new(
                http_metrics.clone(),
                &config.telemetry.metrics_path,
            ))
            .route(
                &config.telemetry.metrics_path,
                web::get().to(MetricsService::snapshot),
            )
            .route("/", web::get().to(DemoService::index))
            .route("/slow", web::get().to(DemoService::slow))
            .route("/error", web::get().to(DemoService::error))
            .route("/users/{id}", web::get().to(DemoService::user_detail))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
