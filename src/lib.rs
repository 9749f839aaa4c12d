//! # cpapwatch
//!
//! Polls CPAP therapy snapshots, keeps a durable history of them and
//! republishes that history as Prometheus gauges.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   Snapshot   ┌────────────┐  Reconciled  ┌───────────┐
//! │  Poller   │─────────────▶│ Reconciler │─────────────▶│ Projector │
//! │ (per      │              │            │              │           │
//! │  account) │              └─────┬──────┘              └─────┬─────┘
//! └─────┬─────┘                    │ read/write                │ set/clear
//!       │ collect()                ▼                           ▼
//! ┌─────┴─────────┐          ┌───────────┐              ┌───────────┐
//! │ SnapshotClient│          │   Store   │◀── read ─────│ Registry  │──▶ /metrics
//! └───────────────┘          └───────────┘              └───────────┘
//! ```
//!
//! - **[`store`]**: keyed documents for patients, devices, masks and sleep
//!   records, with memory and JSON-file backends
//! - **[`reconcile`]**: insert-once for patients/devices/masks, merge for
//!   sleep records with sticky mask attribution
//! - **[`projector`]**: gauge families, active/inactive flags and the
//!   clear-then-set aggregates
//! - **[`scheduler`]**: the per-interval loop with cooperative shutdown
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cpapwatch::{MemoryStore, MetricsProjector, Poller};
//! use cpapwatch_adapters::FileClient;
//! use cpapwatch_sdk::Registry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(Registry::with_namespace("myair"));
//! let projector = MetricsProjector::new(registry.clone())?;
//!
//! let (mut poller, _shutdown) = Poller::builder()
//!     .account(Box::new(FileClient::new("fixtures/account-1")))
//!     .history_months(3)
//!     .build(Arc::new(MemoryStore::new()), projector);
//!
//! poller.run_once().await;
//! println!("{}", registry.render());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod projector;
pub mod reconcile;
pub mod scheduler;
pub mod store;

pub use config::Settings;
pub use error::CycleError;
pub use projector::MetricsProjector;
pub use reconcile::{Reconciled, Reconciler};
pub use scheduler::{run_cycle, Poller, PollerBuilder, ShutdownHandle};
pub use store::{Entity, FileStore, Kind, MemoryStore, Store, StoreError, StoreExt};
