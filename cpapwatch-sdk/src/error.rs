//! Error types for the metrics sink.

use thiserror::Error;

/// Errors raised while registering or updating gauges.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Metric or label name is not a valid Prometheus identifier.
    #[error("invalid metric or label name: {0}")]
    InvalidName(String),

    /// A gauge with this name already exists with different labels.
    #[error("gauge {name} already registered with labels {existing:?}")]
    SchemaConflict { name: String, existing: Vec<String> },

    /// Number of label values does not match the gauge's schema.
    #[error("gauge {name} expects {expected} label values, got {actual}")]
    LabelMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Exporter listen address could not be parsed.
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    /// Exporter socket error.
    #[error("exporter I/O error: {0}")]
    Io(#[from] std::io::Error),
}
