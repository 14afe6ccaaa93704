mod telemetry;

pub use telemetry::RequestTelemetry;
