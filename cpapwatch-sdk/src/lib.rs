//! # cpapwatch-sdk
//!
//! A small metrics sink: named gauge families with a fixed label schema,
//! per-label-combination values, and Prometheus text exposition.
//!
//! ## Quick Start
//!
//! ```rust
//! use cpapwatch_sdk::Registry;
//!
//! let registry = Registry::with_namespace("myair");
//! let score = registry
//!     .gauge("score", "Nightly therapy score", &["patient", "date"])
//!     .unwrap();
//!
//! score.set(&["P1", "2025-08-01"], 85.0).unwrap();
//!
//! let text = registry.render();
//! assert!(text.contains("myair_score{patient=\"P1\",date=\"2025-08-01\"} 85"));
//! ```
//!
//! ## Aggregates
//!
//! Gauges keep every label combination they have ever been set with. For
//! single-valued facts whose labels can change between updates, call
//! [`Gauge::clear`] before setting the fresh value so the old combination
//! does not linger.
//!
//! ## Features
//!
//! - `prometheus`: HTTP exporter serving the registry on `/metrics`

mod error;
mod exposition;
mod registry;

#[cfg(feature = "prometheus")]
pub mod prometheus;

pub use error::SinkError;
pub use exposition::format_prometheus;
pub use registry::{Gauge, Registry};
