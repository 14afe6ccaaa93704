//! Metrics primitives tests
//!
//! Tests for counters, gauges, histograms, the timer handle, the registry
//! and the text exposition output.

use std::sync::Arc;

use httpulse::errors::HttpulseError;
use httpulse::metrics::{Counter, Gauge, Histogram, Registry};

// =============================================================================
// Counter Tests
// =============================================================================

#[test]
fn test_counter_accumulates_per_label_tuple() {
    let counter = Counter::new("jobs_processed_total", "Jobs processed", &["queue"]);

    counter.inc(&[("queue", "default")]);
    counter.inc(&[("queue", "default")]);
    counter
        .inc_by(&[("queue", "default")], 2.5)
        .expect("valid delta");
    counter.inc(&[("queue", "mail")]);

    assert_eq!(counter.value(&[("queue", "default")]), 4.5);
    assert_eq!(counter.value(&[("queue", "mail")]), 1.0);
    assert_eq!(counter.value(&[("queue", "never_touched")]), 0.0);
}

#[test]
fn test_counter_rejects_negative_delta() {
    let counter = Counter::new("jobs_processed_total", "Jobs processed", &["queue"]);

    let err = counter
        .inc_by(&[("queue", "default")], -1.0)
        .expect_err("negative delta must be rejected");
    assert!(matches!(err, HttpulseError::InvalidObservation(_)));
    assert_eq!(err.code(), "E002");

    // The rejected delta must leave the series untouched.
    assert_eq!(counter.value(&[("queue", "default")]), 0.0);
}

#[test]
fn test_counter_rejects_non_finite_delta() {
    let counter = Counter::new("bytes_total", "Bytes", &[]);

    assert!(counter.inc_by(&[], f64::NAN).is_err());
    assert!(counter.inc_by(&[], f64::INFINITY).is_err());
    assert_eq!(counter.value(&[]), 0.0);
}

#[test]
fn test_counter_label_schema_mismatch_is_dropped() {
    let counter = Counter::new("jobs_processed_total", "Jobs processed", &["queue"]);

    // Wrong arity and wrong name both fail tuple resolution; `inc` drops
    // the observation instead of panicking.
    counter.inc(&[]);
    counter.inc(&[("not_queue", "default")]);
    counter.inc(&[("queue", "default"), ("extra", "x")]);

    let err = counter
        .inc_by(&[("not_queue", "default")], 1.0)
        .expect_err("unknown label name must be rejected");
    assert!(matches!(err, HttpulseError::InvalidObservation(_)));

    assert_eq!(counter.value(&[("queue", "default")]), 0.0);
}

#[test]
fn test_counter_label_order_does_not_matter() {
    let counter = Counter::new("hits_total", "Hits", &["method", "route"]);

    counter.inc(&[("method", "GET"), ("route", "/")]);
    counter.inc(&[("route", "/"), ("method", "GET")]);

    assert_eq!(counter.value(&[("route", "/"), ("method", "GET")]), 2.0);
}

#[test]
fn test_counter_concurrent_increments_sum_exactly() {
    let counter = Arc::new(Counter::new("hits_total", "Hits", &["shard"]));
    let threads = 8;
    let per_thread = 1000;

    std::thread::scope(|scope| {
        for _ in 0..threads {
            let counter = counter.clone();
            scope.spawn(move || {
                for _ in 0..per_thread {
                    counter.inc(&[("shard", "a")]);
                }
            });
        }
    });

    assert_eq!(
        counter.value(&[("shard", "a")]),
        (threads * per_thread) as f64
    );
}

// =============================================================================
// Gauge Tests
// =============================================================================

#[test]
fn test_gauge_inc_dec_returns_to_zero() {
    let gauge = Gauge::new("active_jobs", "Active jobs", &[]);

    for _ in 0..5 {
        gauge.inc(&[]);
    }
    for _ in 0..5 {
        gauge.dec(&[]);
    }

    assert_eq!(gauge.value(&[]), 0.0);
}

#[test]
fn test_gauge_set_overwrites_and_add_accumulates() {
    let gauge = Gauge::new("queue_depth", "Queue depth", &["queue"]);

    gauge.set(&[("queue", "default")], 10.0);
    gauge.add(&[("queue", "default")], -3.0);
    gauge.set(&[("queue", "default")], 7.5);

    assert_eq!(gauge.value(&[("queue", "default")]), 7.5);
}

#[test]
fn test_gauge_rejects_non_finite_values() {
    let gauge = Gauge::new("queue_depth", "Queue depth", &[]);

    assert!(gauge.set_checked(&[], f64::NAN).is_err());
    assert!(gauge.add_checked(&[], f64::NEG_INFINITY).is_err());
    assert_eq!(gauge.value(&[]), 0.0);
}

#[test]
fn test_gauge_concurrent_inc_dec_commute() {
    let gauge = Arc::new(Gauge::new("active_jobs", "Active jobs", &[]));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let gauge = gauge.clone();
            scope.spawn(move || {
                for _ in 0..500 {
                    gauge.inc(&[]);
                    gauge.dec(&[]);
                }
            });
        }
    });

    assert_eq!(gauge.value(&[]), 0.0);
}

// =============================================================================
// Histogram Tests
// =============================================================================

#[test]
fn test_histogram_cumulative_bucket_counts() {
    let histogram = Histogram::new(
        "latency_seconds",
        "Latency",
        &[],
        &[0.01, 0.1, 1.0],
    );

    histogram.observe(&[], 0.005); // lands in every bucket
    histogram.observe(&[], 0.05); // 0.1 and 1.0
    histogram.observe(&[], 0.5); // 1.0 only
    histogram.observe(&[], 3.0); // +Inf only

    assert_eq!(histogram.cumulative_counts(&[]), vec![1, 2, 3]);
    assert_eq!(histogram.sample_count(&[]), 4);
    let sum = histogram.sample_sum(&[]);
    assert!((sum - 3.555).abs() < 1e-9);
}

#[test]
fn test_histogram_boundary_value_counts_into_bucket() {
    // `le` is inclusive: a value exactly equal to a bound belongs to it.
    let histogram = Histogram::new("latency_seconds", "Latency", &[], &[0.1, 1.0]);

    histogram.observe(&[], 0.1);

    assert_eq!(histogram.cumulative_counts(&[]), vec![1, 1]);
}

#[test]
fn test_histogram_buckets_sorted_deduped_and_finite() {
    let histogram = Histogram::new(
        "latency_seconds",
        "Latency",
        &[],
        &[1.0, 0.1, f64::NAN, 0.1, f64::INFINITY, 0.01],
    );

    assert_eq!(histogram.bounds(), &[0.01, 0.1, 1.0]);
}

#[test]
fn test_histogram_rejects_non_finite_observation() {
    let histogram = Histogram::new("latency_seconds", "Latency", &[], &[1.0]);

    let err = histogram
        .observe_checked(&[], f64::NAN)
        .expect_err("NaN must be rejected");
    assert!(matches!(err, HttpulseError::InvalidObservation(_)));
    assert_eq!(histogram.sample_count(&[]), 0);
}

#[test]
fn test_histogram_per_tuple_isolation() {
    let histogram = Histogram::new("latency_seconds", "Latency", &["route"], &[1.0]);

    histogram.observe(&[("route", "/a")], 0.5);
    histogram.observe(&[("route", "/a")], 0.5);
    histogram.observe(&[("route", "/b")], 0.5);

    assert_eq!(histogram.sample_count(&[("route", "/a")]), 2);
    assert_eq!(histogram.sample_count(&[("route", "/b")]), 1);
}

// =============================================================================
// Timer Tests
// =============================================================================

#[test]
fn test_timer_merges_start_and_stop_labels() {
    let histogram = Histogram::new(
        "latency_seconds",
        "Latency",
        &["method", "status"],
        &[60.0],
    );

    let mut timer = histogram.start_timer(&[("method", "GET")]);
    let elapsed = timer.stop(&[("status", "200")]);

    assert!(elapsed >= 0.0);
    assert_eq!(
        histogram.sample_count(&[("method", "GET"), ("status", "200")]),
        1
    );
}

#[test]
fn test_timer_stop_labels_override_start_labels() {
    let histogram = Histogram::new("latency_seconds", "Latency", &["status"], &[60.0]);

    // Provisional value at start, real value at stop.
    let mut timer = histogram.start_timer(&[("status", "0")]);
    timer.stop(&[("status", "503")]);

    assert_eq!(histogram.sample_count(&[("status", "503")]), 1);
    assert_eq!(histogram.sample_count(&[("status", "0")]), 0);
}

#[test]
fn test_timer_stop_is_idempotent() {
    let histogram = Histogram::new("latency_seconds", "Latency", &[], &[60.0]);

    let mut timer = histogram.start_timer(&[]);
    let first = timer.stop(&[]);
    let second = timer.stop(&[]);

    assert_eq!(first, second);
    assert_eq!(histogram.sample_count(&[]), 1);
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_registry_rejects_duplicate_metric_name() {
    let registry = Registry::new();
    registry
        .register(Arc::new(Counter::new("hits_total", "Hits", &[])))
        .expect("first registration succeeds");

    let err = registry
        .register(Arc::new(Counter::new("hits_total", "Hits again", &[])))
        .expect_err("duplicate name must be rejected");
    assert!(matches!(err, HttpulseError::Configuration(_)));
    assert_eq!(err.code(), "E001");
}

#[test]
fn test_snapshot_untouched_family_renders_headers_only() {
    let registry = Registry::new();
    registry
        .register(Arc::new(Counter::new("hits_total", "Hits", &["route"])))
        .unwrap();

    let out = registry.snapshot();

    assert!(out.contains("# HELP hits_total Hits\n"));
    assert!(out.contains("# TYPE hits_total counter\n"));
    // No series has been created yet, so there must be no sample line.
    assert!(!out.lines().any(|l| l.starts_with("hits_total")));
}

#[test]
fn test_snapshot_renders_counter_samples_with_default_labels() {
    let registry = Registry::with_default_labels(&[("app", "testapp")]);
    let counter = Arc::new(Counter::new("hits_total", "Hits", &["route"]));
    registry.register(counter.clone()).unwrap();

    counter.inc(&[("route", "/")]);
    counter.inc(&[("route", "/")]);

    let out = registry.snapshot();
    assert!(out.contains("hits_total{app=\"testapp\",route=\"/\"} 2\n"));
}

#[test]
fn test_snapshot_unlabeled_sample_has_no_braces() {
    let registry = Registry::new();
    let gauge = Arc::new(Gauge::new("queue_depth", "Queue depth", &[]));
    registry.register(gauge.clone()).unwrap();

    gauge.set(&[], 3.0);

    let out = registry.snapshot();
    assert!(out.contains("\nqueue_depth 3\n"));
}

#[test]
fn test_snapshot_histogram_exposition_shape() {
    let registry = Registry::new();
    let histogram = Arc::new(Histogram::new(
        "latency_seconds",
        "Latency",
        &["route"],
        &[0.1, 1.0],
    ));
    registry.register(histogram.clone()).unwrap();

    histogram.observe(&[("route", "/")], 0.05);
    histogram.observe(&[("route", "/")], 2.0);

    let out = registry.snapshot();
    assert!(out.contains("# TYPE latency_seconds histogram\n"));
    assert!(out.contains("latency_seconds_bucket{route=\"/\",le=\"0.1\"} 1\n"));
    assert!(out.contains("latency_seconds_bucket{route=\"/\",le=\"1\"} 1\n"));
    // The implicit +Inf bucket always equals the total count.
    assert!(out.contains("latency_seconds_bucket{route=\"/\",le=\"+Inf\"} 2\n"));
    assert!(out.contains("latency_seconds_sum{route=\"/\"} 2.05\n"));
    assert!(out.contains("latency_seconds_count{route=\"/\"} 2\n"));
}

#[test]
fn test_snapshot_escapes_label_values() {
    let registry = Registry::new();
    let counter = Arc::new(Counter::new("hits_total", "Hits", &["route"]));
    registry.register(counter.clone()).unwrap();

    counter.inc(&[("route", "a\"b\\c\nd")]);

    let out = registry.snapshot();
    assert!(out.contains("hits_total{route=\"a\\\"b\\\\c\\nd\"} 1\n"));
}

#[test]
fn test_snapshot_families_render_in_registration_order() {
    let registry = Registry::new();
    registry
        .register(Arc::new(Counter::new("first_total", "First", &[])))
        .unwrap();
    registry
        .register(Arc::new(Gauge::new("second_depth", "Second", &[])))
        .unwrap();

    let out = registry.snapshot();
    let first = out.find("# HELP first_total").unwrap();
    let second = out.find("# HELP second_depth").unwrap();
    assert!(first < second);
}
