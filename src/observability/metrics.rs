//! # Metrics
//!
//! Prometheus metrics for the firewall repositories.
//!
//! ## Metrics Exposed
//!
//! - `nsx_dfw_operations_total` - Firewall operations by operation name
//! - `nsx_dfw_operation_errors_total` - Failed firewall operations by operation name
//! - `nsx_dfw_operation_duration_seconds` - Duration of firewall operations
//! - `nsx_dfw_conflict_retries_total` - Writes retried after a revision conflict
//! - `nsx_dfw_rules_cleared_total` - Rules removed by workload cleanup

use anyhow::{Context, Result};
use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "nsx_dfw_operations_total",
            "Total number of firewall operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create OPERATIONS_TOTAL metric - this should never happen")
});

static OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "nsx_dfw_operation_errors_total",
            "Total number of failed firewall operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "nsx_dfw_operation_duration_seconds",
            "Duration of firewall operations in seconds by operation",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["operation"],
    )
    .expect("Failed to create OPERATION_DURATION metric - this should never happen")
});

static CONFLICT_RETRIES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "nsx_dfw_conflict_retries_total",
        "Total number of writes retried after a revision conflict",
    )
    .expect("Failed to create CONFLICT_RETRIES_TOTAL metric - this should never happen")
});

static RULES_CLEARED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "nsx_dfw_rules_cleared_total",
        "Total number of rules removed by workload cleanup",
    )
    .expect("Failed to create RULES_CLEARED_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
///
/// Safe to call more than once.
///
/// # Errors
/// Returns an error if a metric cannot be registered for any reason other than
/// already being registered
pub fn register_metrics() -> Result<()> {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(OPERATIONS_TOTAL.clone()),
        Box::new(OPERATION_ERRORS_TOTAL.clone()),
        Box::new(OPERATION_DURATION.clone()),
        Box::new(CONFLICT_RETRIES_TOTAL.clone()),
        Box::new(RULES_CLEARED_TOTAL.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to register metric")),
        }
    }

    Ok(())
}

/// Render the registry in the Prometheus text exposition format
///
/// # Errors
/// Returns an error if encoding fails
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not valid UTF-8")
}

pub fn record_operation(operation: &str, duration: f64) {
    OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
    OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_operation_errors(operation: &str) {
    OPERATION_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_conflict_retries() {
    CONFLICT_RETRIES_TOTAL.inc();
}

pub fn increment_rules_cleared(count: u64) {
    RULES_CLEARED_TOTAL.inc_by(count);
}
