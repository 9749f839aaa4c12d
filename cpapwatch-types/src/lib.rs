//! # cpapwatch-types
//!
//! Domain types for CPAP therapy snapshots. One polling cycle against the
//! vendor produces a [`Snapshot`]: the patient profile, the device and mask
//! currently in use, and a window of nightly [`SleepRecord`]s.
//!
//! ## Features
//!
//! - `serde`: deserialize vendor payloads (camelCase field names) and
//!   serialize entities as store documents
//!
//! ## Example
//!
//! ```rust
//! use cpapwatch_types::{Device, Mask, Patient, SleepRecord, Snapshot};
//!
//! let snapshot = Snapshot::builder()
//!     .patient(Patient { id: "P1".into(), first_name: "Ada".into(), last_name: "Lovelace".into(), ..Default::default() })
//!     .device(Device { serial_number: "2319".into(), patient_id: "P1".into(), ..Default::default() })
//!     .mask(Mask { code: "airfit-f20".into(), patient_id: "P1".into(), ..Default::default() })
//!     .record(SleepRecord { sleep_score: 85, ..SleepRecord::new("P1", "2025-08-01") })
//!     .build();
//!
//! assert_eq!(snapshot.patient_id(), "P1");
//! assert_eq!(snapshot.sleep_records.len(), 1);
//! ```
//!
//! ## Asset paths
//!
//! Image references arrive as paths relative to the vendor's static asset
//! host. They are rewritten to absolute URLs by [`normalize_image_path`],
//! which runs during deserialization so that live payloads and documents
//! rehydrated from a store end up identical.

mod asset;
#[cfg(feature = "serde")]
mod de;
mod device;
mod mask;
mod patient;
mod sleep_record;
mod snapshot;

pub use asset::{normalize_image_path, ASSET_BASE_URL};
pub use device::Device;
pub use mask::Mask;
pub use patient::Patient;
pub use sleep_record::SleepRecord;
pub use snapshot::{Snapshot, SnapshotBuilder};
