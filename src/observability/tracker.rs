//! Per-operation span and metric bookkeeping
//!
//! Every repository call wraps its work in an [`OperationTracker`] so success,
//! failure and duration land in the span and in Prometheus the same way.

use std::time::{Duration, Instant};
use tracing::Span;

use super::metrics;

/// Span for one firewall operation, with the outcome fields left empty for the tracker
macro_rules! op_span {
    ($level:expr, $name:expr, $($fields:tt)+) => {
        tracing::span!(
            $level,
            $name,
            $($fields)+,
            operation.success = tracing::field::Empty,
            operation.duration_ms = tracing::field::Empty,
            error.message = tracing::field::Empty
        )
    };
}

pub(crate) use op_span;

/// Records operation metrics and span attributes for a successful operation
pub fn record_success_metrics(span: &Span, operation: &str, duration: Duration) {
    span.record("operation.success", true);
    span.record("operation.duration_ms", duration_ms(duration));
    metrics::record_operation(operation, duration.as_secs_f64());
}

/// Records operation metrics and span attributes for a failed operation
pub fn record_error_metrics(span: &Span, operation: &str, error_message: &str, duration: Duration) {
    span.record("operation.success", false);
    span.record("error.message", error_message);
    span.record("operation.duration_ms", duration_ms(duration));
    metrics::increment_operation_errors(operation);
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Helper struct for tracking operation state
#[derive(Debug)]
pub struct OperationTracker {
    operation: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTracker {
    /// Create a new operation tracker
    pub fn new(operation: &'static str, span: Span) -> Self {
        Self {
            operation,
            start: Instant::now(),
            span,
        }
    }

    /// Record the outcome of `result` and hand it back unchanged
    pub fn finish<T, E: std::fmt::Display>(&self, result: Result<T, E>) -> Result<T, E> {
        match &result {
            Ok(_) => record_success_metrics(&self.span, self.operation, self.start.elapsed()),
            Err(e) => record_error_metrics(
                &self.span,
                self.operation,
                &e.to_string(),
                self.start.elapsed(),
            ),
        }
        result
    }
}
