//! Metrics registry
//!
//! Owns the set of registered metric families and renders the Prometheus
//! text exposition. Registration happens once at startup; rendering only
//! reads atomics, so a scrape never serializes against request handling.
//! Mutations racing a scrape may appear partially in the output, which is an
//! accepted relaxation for sampled data.

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::RwLock;

use super::series::MetricDesc;
use crate::errors::{HttpulseError, Result};

/// A metric family that can describe itself and render its current samples.
pub trait Collect: Send + Sync {
    fn desc(&self) -> &MetricDesc;
    fn render(&self, out: &mut String, default_labels: &[(String, String)]);
}

pub struct Registry {
    collectors: RwLock<Vec<Arc<dyn Collect>>>,
    default_labels: Vec<(String, String)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_default_labels(&[])
    }

    /// Default labels are attached to every rendered sample line and never
    /// vary per request (e.g. `app="httpulse"`).
    pub fn with_default_labels(labels: &[(&str, &str)]) -> Self {
        Self {
            collectors: RwLock::new(Vec::new()),
            default_labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Register a metric family. Duplicate names are a fatal configuration
    /// error surfaced at startup, not a runtime condition.
    pub fn register(&self, collector: Arc<dyn Collect>) -> Result<()> {
        let mut collectors = self.collectors.write();
        let name = &collector.desc().name;
        if collectors.iter().any(|c| &c.desc().name == name) {
            return Err(HttpulseError::configuration(format!(
                "metric {:?} is already registered",
                name
            )));
        }
        collectors.push(collector);
        Ok(())
    }

    /// Render all families in registration order as Prometheus text.
    pub fn snapshot(&self) -> String {
        let collectors = self.collectors.read();
        let mut out = String::with_capacity(4096);
        for collector in collectors.iter() {
            collector.render(&mut out, &self.default_labels);
        }
        out
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn write_header(out: &mut String, desc: &MetricDesc) {
    let _ = writeln!(out, "# HELP {} {}", desc.name, escape_help(&desc.help));
    let _ = writeln!(out, "# TYPE {} {}", desc.name, desc.kind.as_str());
}

/// One sample line: `name{label="value",...} value`. Default labels come
/// first, then the declared labels in order, then `extra` (the histogram
/// `le` bound). Braces are omitted when there are no labels at all.
pub(crate) fn write_sample(
    out: &mut String,
    name: &str,
    default_labels: &[(String, String)],
    label_names: &[String],
    tuple: &[String],
    extra: Option<(&str, &str)>,
    value: f64,
) {
    out.push_str(name);

    let total = default_labels.len() + tuple.len() + usize::from(extra.is_some());
    if total > 0 {
        out.push('{');
        let mut first = true;
        for (k, v) in default_labels {
            push_pair(out, &mut first, k, v);
        }
        for (k, v) in label_names.iter().zip(tuple) {
            push_pair(out, &mut first, k, v);
        }
        if let Some((k, v)) = extra {
            push_pair(out, &mut first, k, v);
        }
        out.push('}');
    }

    out.push(' ');
    out.push_str(&fmt_value(value));
    out.push('\n');
}

fn push_pair(out: &mut String, first: &mut bool, key: &str, value: &str) {
    if !*first {
        out.push(',');
    }
    *first = false;
    let _ = write!(out, "{}=\"{}\"", key, escape_label_value(value));
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Integral values render without a decimal point, matching the common
/// exposition style (`1` rather than `1.0`).
pub(crate) fn fmt_value(value: f64) -> String {
    if value.is_finite() && value == value.trunc() && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
