//! Keyed document storage for the four entity kinds.
//!
//! Backends implement the small, object-safe [`Store`] trait over JSON
//! documents. Typed access (and the aggregates the projector needs) comes
//! from [`StoreExt`], which every store gets for free. Decoding goes through
//! the entity deserializers, so rehydrated rows get the same asset URL
//! normalization as live payloads.

mod file;
mod memory;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use cpapwatch_types::{Device, Mask, Patient, SleepRecord};

pub use file::FileStore;
pub use memory::MemoryStore;

/// The collection an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Patient,
    Device,
    Mask,
    SleepRecord,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Patient, Kind::Device, Kind::Mask, Kind::SleepRecord];

    /// Collection name, also used as the file stem by [`FileStore`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Patient => "patients",
            Kind::Device => "devices",
            Kind::Mask => "masks",
            Kind::SleepRecord => "sleep_records",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed")]
    Io(#[from] std::io::Error),

    #[error("failed to encode {kind} document")]
    Encode {
        kind: Kind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {kind} document '{id}'")]
    Decode {
        kind: Kind,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// A persisted domain entity.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: Kind;

    /// Unique key of the row inside its collection.
    fn document_id(&self) -> String;

    /// Patient the row belongs to.
    fn patient_id(&self) -> &str;
}

/// Key of a row owned by a patient, e.g. `P1/2025-08-01`.
pub fn patient_key(patient_id: &str, local_id: &str) -> String {
    format!("{}/{}", patient_id, local_id)
}

impl Entity for Patient {
    const KIND: Kind = Kind::Patient;

    fn document_id(&self) -> String {
        self.id.clone()
    }

    fn patient_id(&self) -> &str {
        &self.id
    }
}

impl Entity for Device {
    const KIND: Kind = Kind::Device;

    fn document_id(&self) -> String {
        patient_key(&self.patient_id, &self.serial_number)
    }

    fn patient_id(&self) -> &str {
        &self.patient_id
    }
}

impl Entity for Mask {
    const KIND: Kind = Kind::Mask;

    fn document_id(&self) -> String {
        patient_key(&self.patient_id, &self.code)
    }

    fn patient_id(&self) -> &str {
        &self.patient_id
    }
}

impl Entity for SleepRecord {
    const KIND: Kind = Kind::SleepRecord;

    fn document_id(&self) -> String {
        patient_key(&self.patient_id, &self.start_date)
    }

    fn patient_id(&self) -> &str {
        &self.patient_id
    }
}

/// Raw document storage.
///
/// Every operation is keyed, so retrying a call with the same key and
/// document leaves the store in the same state.
pub trait Store: Send + Sync + fmt::Debug {
    /// Fetch one document.
    fn document(&self, kind: Kind, id: &str) -> Result<Option<Value>, StoreError>;

    /// Every document of a kind, ordered by id.
    fn documents(&self, kind: Kind) -> Result<Vec<(String, Value)>, StoreError>;

    /// Store `doc` unless `id` is taken. Returns true if it was inserted.
    fn insert_document(&self, kind: Kind, id: &str, doc: Value) -> Result<bool, StoreError>;

    /// Overlay the top-level fields of `doc` onto the stored document,
    /// inserting it if absent.
    fn merge_document(&self, kind: Kind, id: &str, doc: Value) -> Result<(), StoreError>;
}

/// Typed access on top of any [`Store`].
pub trait StoreExt: Store {
    fn get<E: Entity>(&self, id: &str) -> Result<Option<E>, StoreError> {
        self.document(E::KIND, id)?
            .map(|doc| decode(id, doc))
            .transpose()
    }

    fn list<E: Entity>(&self) -> Result<Vec<E>, StoreError> {
        self.documents(E::KIND)?
            .into_iter()
            .map(|(id, doc)| decode(&id, doc))
            .collect()
    }

    fn list_by_patient<E: Entity>(&self, patient_id: &str) -> Result<Vec<E>, StoreError> {
        Ok(self
            .list::<E>()?
            .into_iter()
            .filter(|e| e.patient_id() == patient_id)
            .collect())
    }

    fn insert_if_absent<E: Entity>(&self, entity: &E) -> Result<bool, StoreError> {
        self.insert_document(E::KIND, &entity.document_id(), encode(entity)?)
    }

    /// Last-write-wins merge of a sleep record; inserts when absent.
    fn upsert_merged(&self, record: &SleepRecord) -> Result<(), StoreError> {
        self.merge_document(Kind::SleepRecord, &record.document_id(), encode(record)?)
    }

    /// Most recent night persisted for the patient.
    fn last_report_date(&self, patient_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .list_by_patient::<SleepRecord>(patient_id)?
            .into_iter()
            .map(|r| r.start_date)
            .max())
    }

    /// Usage across every persisted night, in seconds.
    fn total_usage_seconds(&self, patient_id: &str) -> Result<u64, StoreError> {
        Ok(self
            .list_by_patient::<SleepRecord>(patient_id)?
            .iter()
            .map(SleepRecord::usage_seconds)
            .sum())
    }

    /// Number of persisted nights, skipping zero-score nights unless asked.
    fn total_days_count(&self, patient_id: &str, include_zero: bool) -> Result<usize, StoreError> {
        Ok(self
            .list_by_patient::<SleepRecord>(patient_id)?
            .iter()
            .filter(|r| include_zero || !r.is_zero_score())
            .count())
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

fn encode<E: Entity>(entity: &E) -> Result<Value, StoreError> {
    serde_json::to_value(entity).map_err(|source| StoreError::Encode {
        kind: E::KIND,
        source,
    })
}

fn decode<E: Entity>(id: &str, doc: Value) -> Result<E, StoreError> {
    serde_json::from_value(doc).map_err(|source| StoreError::Decode {
        kind: E::KIND,
        id: id.to_string(),
        source,
    })
}

/// Top-level field overlay used by [`Store::merge_document`] backends.
pub(crate) fn merge_into(existing: &mut Value, doc: Value) {
    match (existing, doc) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (key, value) in fields {
                existing.insert(key, value);
            }
        }
        (existing, doc) => *existing = doc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(date: &str, usage: u32, score: u32) -> SleepRecord {
        SleepRecord {
            total_usage: usage,
            sleep_score: score,
            ..SleepRecord::new("P1", date)
        }
    }

    #[test]
    fn test_document_ids() {
        let device = Device {
            serial_number: "2319".into(),
            patient_id: "P1".into(),
            ..Default::default()
        };
        assert_eq!(device.document_id(), "P1/2319");
        assert_eq!(record("2025-08-01", 0, 0).document_id(), "P1/2025-08-01");
        assert_eq!(Kind::SleepRecord.to_string(), "sleep_records");
    }

    #[test]
    fn test_merge_into_overlays_fields() {
        let mut existing = json!({ "a": 1, "b": 2, "extra": true });
        merge_into(&mut existing, json!({ "a": 10, "c": 3 }));
        assert_eq!(existing, json!({ "a": 10, "b": 2, "c": 3, "extra": true }));
    }

    #[test]
    fn test_typed_roundtrip_normalizes_image() {
        let store = MemoryStore::new();
        store
            .insert_document(
                Kind::Mask,
                "P1/f20",
                json!({ "maskCode": "f20", "maskPatientId": "P1", "imagePath": "masks/f20.png" }),
            )
            .unwrap();

        let mask: Mask = store.get("P1/f20").unwrap().unwrap();
        assert_eq!(mask.image_path, "https://static.myair-prd.dht.live/masks/f20.png");
    }

    #[test]
    fn test_decode_error_names_document() {
        let store = MemoryStore::new();
        store
            .insert_document(Kind::Patient, "P1", json!("not an object"))
            .unwrap();

        let err = store.get::<Patient>("P1").unwrap_err();
        assert!(err.to_string().contains("patients document 'P1'"));
    }

    #[test]
    fn test_list_by_patient_filters() {
        let store = MemoryStore::new();
        store.upsert_merged(&record("2025-08-01", 60, 80)).unwrap();
        store
            .upsert_merged(&SleepRecord::new("P2", "2025-08-01"))
            .unwrap();

        assert_eq!(store.list::<SleepRecord>().unwrap().len(), 2);
        assert_eq!(store.list_by_patient::<SleepRecord>("P1").unwrap().len(), 1);
        assert!(store.list_by_patient::<SleepRecord>("P3").unwrap().is_empty());
    }

    #[test]
    fn test_aggregates() {
        let store = MemoryStore::new();
        store.upsert_merged(&record("2025-08-02", 452, 85)).unwrap();
        store.upsert_merged(&record("2025-08-01", 300, 70)).unwrap();
        store.upsert_merged(&record("2025-08-03", 0, 0)).unwrap();

        assert_eq!(
            store.last_report_date("P1").unwrap().as_deref(),
            Some("2025-08-03")
        );
        assert_eq!(store.total_usage_seconds("P1").unwrap(), (452 + 300) * 60);
        assert_eq!(store.total_days_count("P1", false).unwrap(), 2);
        assert_eq!(store.total_days_count("P1", true).unwrap(), 3);

        assert_eq!(store.last_report_date("P9").unwrap(), None);
        assert_eq!(store.total_usage_seconds("P9").unwrap(), 0);
    }
}
