mod demo;
mod metrics;

pub use demo::DemoService;
pub use metrics::MetricsService;
