//! Observability infrastructure

pub mod metrics;

pub use metrics::{GradingMetrics, init_metrics};
