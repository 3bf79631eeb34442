//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//! - `tracker`: span + metric bookkeeping around each firewall operation

pub mod metrics;
pub mod tracker;

pub use tracker::OperationTracker;
