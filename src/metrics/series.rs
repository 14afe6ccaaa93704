//! Metric series primitives
//!
//! Counter (monotonic sum), Histogram (bucketed distribution) and Gauge
//! (point-in-time value). Each family owns an immutable descriptor and a
//! lazily grown map from label tuples to numeric cells. Hot-path updates are
//! plain atomic operations on the cell for the addressed tuple; updates to
//! different tuples never coordinate, and nothing here blocks on the
//! registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use tracing::warn;

use super::registry::{Collect, write_header, write_sample};
use crate::errors::{HttpulseError, Result};

/// Borrowed `(name, value)` label pairs supplied at call sites.
///
/// Pairs may be given in any order; they are resolved against the declared
/// label names of the descriptor, and every declared name must be present.
pub type LabelPairs<'a> = &'a [(&'a str, &'a str)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Histogram,
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// Immutable metric metadata, fixed at construction.
#[derive(Debug, Clone)]
pub struct MetricDesc {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
}

impl MetricDesc {
    fn new(name: &str, help: &str, kind: MetricKind, label_names: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            label_names: label_names.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Resolve caller-supplied pairs into the canonical tuple of label values
    /// in declared order. The set of supplied names must exactly equal the
    /// declared names; no partial labels.
    fn tuple_for(&self, labels: LabelPairs) -> Result<Vec<String>> {
        if labels.len() != self.label_names.len() {
            return Err(HttpulseError::invalid_observation(format!(
                "metric {} declares {} label(s), got {}",
                self.name,
                self.label_names.len(),
                labels.len()
            )));
        }
        self.label_names
            .iter()
            .map(|name| {
                labels
                    .iter()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| (*v).to_string())
                    .ok_or_else(|| {
                        HttpulseError::invalid_observation(format!(
                            "metric {} is missing label {:?}",
                            self.name, name
                        ))
                    })
            })
            .collect()
    }
}

/// f64 stored as its bit pattern in an `AtomicU64`; additions use a CAS loop
/// so concurrent deltas commute.
#[derive(Debug, Default)]
struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    fn add(&self, delta: f64) {
        let mut cur = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + delta).to_bits();
            match self
                .bits
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => cur = actual,
            }
        }
    }

    fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

// =============================================================================
// Counter
// =============================================================================

/// Monotonically non-decreasing accumulator, one cell per label tuple.
#[derive(Debug)]
pub struct Counter {
    desc: MetricDesc,
    series: DashMap<Vec<String>, AtomicF64>,
}

impl Counter {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Self {
        Self {
            desc: MetricDesc::new(name, help, MetricKind::Counter, label_names),
            series: DashMap::new(),
        }
    }

    /// Increment by 1. Invalid observations are logged and dropped.
    pub fn inc(&self, labels: LabelPairs) {
        if let Err(e) = self.inc_by(labels, 1.0) {
            warn!("dropped observation on {}: {}", self.desc.name, e);
        }
    }

    /// Increment by `delta`, which must be finite and non-negative.
    ///
    /// The cell for an unseen label tuple is created on first use,
    /// initialized to 0; insertion races have a single winner and losers
    /// observe the existing cell.
    pub fn inc_by(&self, labels: LabelPairs, delta: f64) -> Result<()> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(HttpulseError::invalid_observation(format!(
                "counter {} delta must be finite and >= 0, got {}",
                self.desc.name, delta
            )));
        }
        let tuple = self.desc.tuple_for(labels)?;
        if let Some(cell) = self.series.get(&tuple) {
            cell.add(delta);
            return Ok(());
        }
        self.series.entry(tuple).or_default().add(delta);
        Ok(())
    }

    /// Current value for a tuple; 0 if it has never been observed.
    pub fn value(&self, labels: LabelPairs) -> f64 {
        self.desc
            .tuple_for(labels)
            .ok()
            .and_then(|tuple| self.series.get(&tuple).map(|cell| cell.get()))
            .unwrap_or(0.0)
    }
}

impl Collect for Counter {
    fn desc(&self) -> &MetricDesc {
        &self.desc
    }

    fn render(&self, out: &mut String, default_labels: &[(String, String)]) {
        write_header(out, &self.desc);
        for (tuple, value) in sorted_rows(&self.series) {
            write_sample(
                out,
                &self.desc.name,
                default_labels,
                &self.desc.label_names,
                &tuple,
                None,
                value,
            );
        }
    }
}

// =============================================================================
// Gauge
// =============================================================================

/// Arbitrary settable value, one cell per label tuple. Concurrent increments
/// and decrements commute; there is no monotonicity constraint.
#[derive(Debug)]
pub struct Gauge {
    desc: MetricDesc,
    series: DashMap<Vec<String>, AtomicF64>,
}

impl Gauge {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Self {
        Self {
            desc: MetricDesc::new(name, help, MetricKind::Gauge, label_names),
            series: DashMap::new(),
        }
    }

    pub fn inc(&self, labels: LabelPairs) {
        self.add(labels, 1.0);
    }

    pub fn dec(&self, labels: LabelPairs) {
        self.add(labels, -1.0);
    }

    /// Add `delta` (may be negative). Invalid observations are logged and
    /// dropped.
    pub fn add(&self, labels: LabelPairs, delta: f64) {
        if let Err(e) = self.add_checked(labels, delta) {
            warn!("dropped observation on {}: {}", self.desc.name, e);
        }
    }

    pub fn add_checked(&self, labels: LabelPairs, delta: f64) -> Result<()> {
        if !delta.is_finite() {
            return Err(HttpulseError::invalid_observation(format!(
                "gauge {} delta must be finite, got {}",
                self.desc.name, delta
            )));
        }
        let tuple = self.desc.tuple_for(labels)?;
        if let Some(cell) = self.series.get(&tuple) {
            cell.add(delta);
            return Ok(());
        }
        self.series.entry(tuple).or_default().add(delta);
        Ok(())
    }

    /// Set the cell to `value`. Invalid observations are logged and dropped.
    pub fn set(&self, labels: LabelPairs, value: f64) {
        if let Err(e) = self.set_checked(labels, value) {
            warn!("dropped observation on {}: {}", self.desc.name, e);
        }
    }

    pub fn set_checked(&self, labels: LabelPairs, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(HttpulseError::invalid_observation(format!(
                "gauge {} value must be finite, got {}",
                self.desc.name, value
            )));
        }
        let tuple = self.desc.tuple_for(labels)?;
        self.series.entry(tuple).or_default().set(value);
        Ok(())
    }

    /// Current value for a tuple; 0 if it has never been touched.
    pub fn value(&self, labels: LabelPairs) -> f64 {
        self.desc
            .tuple_for(labels)
            .ok()
            .and_then(|tuple| self.series.get(&tuple).map(|cell| cell.get()))
            .unwrap_or(0.0)
    }
}

impl Collect for Gauge {
    fn desc(&self) -> &MetricDesc {
        &self.desc
    }

    fn render(&self, out: &mut String, default_labels: &[(String, String)]) {
        write_header(out, &self.desc);
        for (tuple, value) in sorted_rows(&self.series) {
            write_sample(
                out,
                &self.desc.name,
                default_labels,
                &self.desc.label_names,
                &tuple,
                None,
                value,
            );
        }
    }
}

// =============================================================================
// Histogram
// =============================================================================

#[derive(Debug)]
struct HistogramCell {
    /// Cumulative count per configured bound: an observation increments every
    /// bucket whose bound is >= the value.
    bucket_counts: Vec<AtomicU64>,
    sum: AtomicF64,
    count: AtomicU64,
}

impl HistogramCell {
    fn new(buckets: usize) -> Self {
        Self {
            bucket_counts: (0..buckets).map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicF64::default(),
            count: AtomicU64::new(0),
        }
    }
}

/// Bucketed distribution summary with running sum and total count, one cell
/// per label tuple. The implicit `+Inf` bucket always equals the total count.
#[derive(Debug)]
pub struct Histogram {
    desc: MetricDesc,
    bounds: Vec<f64>,
    series: DashMap<Vec<String>, HistogramCell>,
}

impl Histogram {
    /// Non-finite bounds are discarded; the remaining bounds are sorted and
    /// deduplicated.
    pub fn new(name: &str, help: &str, label_names: &[&str], buckets: &[f64]) -> Self {
        let mut bounds: Vec<f64> = buckets.iter().copied().filter(|b| b.is_finite()).collect();
        bounds.sort_by(f64::total_cmp);
        bounds.dedup();
        Self {
            desc: MetricDesc::new(name, help, MetricKind::Histogram, label_names),
            bounds,
            series: DashMap::new(),
        }
    }

    /// Record `value`. Invalid observations are logged and dropped.
    pub fn observe(&self, labels: LabelPairs, value: f64) {
        if let Err(e) = self.observe_checked(labels, value) {
            warn!("dropped observation on {}: {}", self.desc.name, e);
        }
    }

    /// Record `value`, which must be finite.
    pub fn observe_checked(&self, labels: LabelPairs, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(HttpulseError::invalid_observation(format!(
                "histogram {} value must be finite, got {}",
                self.desc.name, value
            )));
        }
        let tuple = self.desc.tuple_for(labels)?;
        if let Some(cell) = self.series.get(&tuple) {
            Self::record(&cell, &self.bounds, value);
            return Ok(());
        }
        let cell = self
            .series
            .entry(tuple)
            .or_insert_with(|| HistogramCell::new(self.bounds.len()));
        Self::record(&cell, &self.bounds, value);
        Ok(())
    }

    fn record(cell: &HistogramCell, bounds: &[f64], value: f64) {
        for (i, bound) in bounds.iter().enumerate() {
            if value <= *bound {
                cell.bucket_counts[i].fetch_add(1, Ordering::Relaxed);
            }
        }
        cell.sum.add(value);
        // Written last so a scrape that sees the new count also sees the
        // bucket and sum updates.
        cell.count.fetch_add(1, Ordering::Release);
    }

    /// Start a timer whose elapsed time is observed when the returned handle
    /// is stopped. Labels supplied here may be partial; the remainder is
    /// supplied at stop time.
    pub fn start_timer(&self, labels: LabelPairs) -> HistogramTimer<'_> {
        HistogramTimer {
            histogram: self,
            partial: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            start: Instant::now(),
            recorded: None,
        }
    }

    pub fn sample_count(&self, labels: LabelPairs) -> u64 {
        self.desc
            .tuple_for(labels)
            .ok()
            .and_then(|tuple| {
                self.series
                    .get(&tuple)
                    .map(|cell| cell.count.load(Ordering::Acquire))
            })
            .unwrap_or(0)
    }

    pub fn sample_sum(&self, labels: LabelPairs) -> f64 {
        self.desc
            .tuple_for(labels)
            .ok()
            .and_then(|tuple| self.series.get(&tuple).map(|cell| cell.sum.get()))
            .unwrap_or(0.0)
    }

    /// Cumulative per-bucket counts for a tuple, in bound order.
    pub fn cumulative_counts(&self, labels: LabelPairs) -> Vec<u64> {
        self.desc
            .tuple_for(labels)
            .ok()
            .and_then(|tuple| {
                self.series.get(&tuple).map(|cell| {
                    cell.bucket_counts
                        .iter()
                        .map(|c| c.load(Ordering::Relaxed))
                        .collect()
                })
            })
            .unwrap_or_default()
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }
}

impl Collect for Histogram {
    fn desc(&self) -> &MetricDesc {
        &self.desc
    }

    fn render(&self, out: &mut String, default_labels: &[(String, String)]) {
        write_header(out, &self.desc);

        let mut tuples: Vec<Vec<String>> = self.series.iter().map(|e| e.key().clone()).collect();
        tuples.sort();

        let bucket_name = format!("{}_bucket", self.desc.name);
        let sum_name = format!("{}_sum", self.desc.name);
        let count_name = format!("{}_count", self.desc.name);

        for tuple in tuples {
            let Some(cell) = self.series.get(&tuple) else {
                continue;
            };
            let count = cell.count.load(Ordering::Acquire);
            for (i, bound) in self.bounds.iter().enumerate() {
                write_sample(
                    out,
                    &bucket_name,
                    default_labels,
                    &self.desc.label_names,
                    &tuple,
                    Some(("le", &super::registry::fmt_value(*bound))),
                    cell.bucket_counts[i].load(Ordering::Relaxed) as f64,
                );
            }
            write_sample(
                out,
                &bucket_name,
                default_labels,
                &self.desc.label_names,
                &tuple,
                Some(("le", "+Inf")),
                count as f64,
            );
            write_sample(
                out,
                &sum_name,
                default_labels,
                &self.desc.label_names,
                &tuple,
                None,
                cell.sum.get(),
            );
            write_sample(
                out,
                &count_name,
                default_labels,
                &self.desc.label_names,
                &tuple,
                None,
                count as f64,
            );
        }
    }
}

/// Two-phase timer handle: labels known up front are captured at start,
/// late-bound labels (e.g. the status code) are merged in at stop.
pub struct HistogramTimer<'a> {
    histogram: &'a Histogram,
    partial: Vec<(String, String)>,
    start: Instant,
    recorded: Option<f64>,
}

impl HistogramTimer<'_> {
    /// Stop the timer and observe the elapsed wall-clock seconds.
    ///
    /// `labels` are merged with the labels given at start; on a name
    /// collision the value supplied here wins. Stopping more than once is a
    /// no-op: later calls return the originally recorded duration.
    pub fn stop(&mut self, labels: LabelPairs) -> f64 {
        if let Some(recorded) = self.recorded {
            return recorded;
        }
        let elapsed = self.start.elapsed().as_secs_f64();

        let mut merged = self.partial.clone();
        for (name, value) in labels {
            if let Some(slot) = merged.iter_mut().find(|(k, _)| k == name) {
                slot.1 = (*value).to_string();
            } else {
                merged.push((name.to_string(), value.to_string()));
            }
        }
        let pairs: Vec<(&str, &str)> = merged
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        self.histogram.observe(&pairs, elapsed);
        self.recorded = Some(elapsed);
        elapsed
    }
}

/// Snapshot the rows of a simple (single-cell) family in a stable
/// lexicographic tuple order.
fn sorted_rows(series: &DashMap<Vec<String>, AtomicF64>) -> Vec<(Vec<String>, f64)> {
    let mut rows: Vec<(Vec<String>, f64)> = series
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().get()))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}
