//! # cpapwatch-adapters
//!
//! Clients that fetch one account's therapy snapshot.
//!
//! Every client implements [`SnapshotClient`], which mirrors the vendor
//! session: connect, read the device, sleep records, profile and mask
//! payloads, then close. [`collect`] drives that sequence and decodes the
//! raw payloads into a typed [`Snapshot`].
//!
//! ## Supported Sources
//!
//! - **File** ([`FileClient`]) - reads payloads from JSON files in a
//!   directory; useful for replaying captured data and for tests
//! - **HTTP** (`http` feature) - talks to a REST bridge that fronts the
//!   vendor API and handles its authentication
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cpapwatch_adapters::{collect, FileClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = FileClient::new("fixtures/account-1");
//!
//!     // Three months of history
//!     let snapshot = collect(&mut client, 3).await?;
//!
//!     println!("Fetched {} nights", snapshot.sleep_records.len());
//!     Ok(())
//! }
//! ```

mod client;
pub mod error;
mod file;

#[cfg(feature = "http")]
pub mod http;

pub use client::{collect, SnapshotClient};
pub use error::FetchError;
pub use file::FileClient;

// Re-export types for convenience
pub use cpapwatch_types::{Device, Mask, Patient, SleepRecord, Snapshot};
