//! Snapshot - one poll cycle's bundle of therapy data for one account.

use crate::{Device, Mask, Patient, SleepRecord};

/// Everything fetched for one account in a single poll.
///
/// The `device` and `mask` are the ones the vendor currently reports as in
/// use; history of previously used devices and masks lives in the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub patient: Patient,
    /// Currently active device.
    pub device: Device,
    /// Currently active mask.
    pub mask: Mask,
    /// Nights inside the requested history window.
    pub sleep_records: Vec<SleepRecord>,
    /// Unix timestamp in milliseconds when the snapshot was fetched.
    pub fetched_at_ms: u64,
}

impl Snapshot {
    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Patient identifier used for aggregate lookups.
    ///
    /// This is the active device's patient, falling back to the profile id
    /// when the device payload carries none.
    pub fn patient_id(&self) -> &str {
        if self.device.patient_id.is_empty() {
            &self.patient.id
        } else {
            &self.device.patient_id
        }
    }

    /// Check if the snapshot carries no sleep records.
    pub fn is_empty(&self) -> bool {
        self.sleep_records.is_empty()
    }
}

/// Builder for constructing `Snapshot` instances.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
    fetched_at_ms: Option<u64>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patient(mut self, patient: Patient) -> Self {
        self.snapshot.patient = patient;
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.snapshot.device = device;
        self
    }

    pub fn mask(mut self, mask: Mask) -> Self {
        self.snapshot.mask = mask;
        self
    }

    /// Append a single sleep record.
    pub fn record(mut self, record: SleepRecord) -> Self {
        self.snapshot.sleep_records.push(record);
        self
    }

    /// Append several sleep records.
    pub fn records(mut self, records: impl IntoIterator<Item = SleepRecord>) -> Self {
        self.snapshot.sleep_records.extend(records);
        self
    }

    /// Set a specific fetch timestamp (milliseconds since Unix epoch).
    pub fn fetched_at_ms(mut self, ts: u64) -> Self {
        self.fetched_at_ms = Some(ts);
        self
    }

    /// Build the snapshot, stamping the current time if none was set.
    pub fn build(self) -> Snapshot {
        Snapshot {
            fetched_at_ms: self.fetched_at_ms.unwrap_or_else(current_timestamp_ms),
            ..self.snapshot
        }
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_builder() {
        let snapshot = Snapshot::builder()
            .fetched_at_ms(1754006400000)
            .patient(Patient {
                id: "P1".into(),
                ..Default::default()
            })
            .record(SleepRecord::new("P1", "2025-08-01"))
            .records(vec![SleepRecord::new("P1", "2025-08-02")])
            .build();

        assert_eq!(snapshot.fetched_at_ms, 1754006400000);
        assert_eq!(snapshot.sleep_records.len(), 2);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_build_stamps_current_time() {
        let snapshot = Snapshot::builder().build();
        assert!(snapshot.fetched_at_ms > 0);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_patient_id_prefers_active_device() {
        let snapshot = Snapshot::builder()
            .patient(Patient {
                id: "profile".into(),
                ..Default::default()
            })
            .device(Device {
                patient_id: "device-owner".into(),
                ..Default::default()
            })
            .build();
        assert_eq!(snapshot.patient_id(), "device-owner");

        let snapshot = Snapshot::builder()
            .patient(Patient {
                id: "profile".into(),
                ..Default::default()
            })
            .build();
        assert_eq!(snapshot.patient_id(), "profile");
    }
}
