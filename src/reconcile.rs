//! Merging fetched snapshots into persisted history.

use std::sync::Arc;

use tracing::{debug, info, warn};

use cpapwatch_types::{Mask, SleepRecord, Snapshot};

use crate::error::chain;
use crate::store::{patient_key, Entity, Store, StoreError, StoreExt};

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub patient_inserted: bool,
    pub device_inserted: bool,
    pub mask_inserted: bool,
    /// Sleep records as persisted, after mask attribution.
    pub records: Vec<SleepRecord>,
    /// Nights that failed to persist this cycle.
    pub failed_dates: Vec<String>,
}

/// Applies the merge policy for each entity kind.
///
/// Patients, devices and masks are written once and never updated. Sleep
/// records are merged every cycle, except that a night's mask attribution
/// sticks once it has been stored.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<dyn Store>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Persist one snapshot.
    ///
    /// A failure on the patient, device or mask aborts the pass. A failure on
    /// a single night is logged and recorded in
    /// [`Reconciled::failed_dates`]; the remaining nights still reconcile.
    pub fn reconcile(&self, snapshot: &Snapshot) -> Result<Reconciled, StoreError> {
        let mut reconciled = Reconciled {
            patient_inserted: self.insert(&snapshot.patient)?,
            device_inserted: self.insert(&snapshot.device)?,
            mask_inserted: self.insert(&snapshot.mask)?,
            ..Default::default()
        };

        for record in &snapshot.sleep_records {
            match self.reconcile_record(record, &snapshot.mask) {
                Ok(persisted) => reconciled.records.push(persisted),
                Err(e) => {
                    warn!(
                        "Failed to persist sleep record {}: {}",
                        record.document_id(),
                        chain(&e)
                    );
                    reconciled.failed_dates.push(record.start_date.clone());
                }
            }
        }

        Ok(reconciled)
    }

    /// Attribute a mask to one night and merge it into the store.
    ///
    /// New nights get `current_mask`. A night already attributed to a mask
    /// keeps that mask.
    pub fn reconcile_record(
        &self,
        record: &SleepRecord,
        current_mask: &Mask,
    ) -> Result<SleepRecord, StoreError> {
        let existing: Option<SleepRecord> = self.store.get(&record.document_id())?;
        let stored_code = existing.and_then(|r| r.mask_code);

        let entry_mask = match &stored_code {
            Some(code) => self.historical_mask(&record.patient_id, code, current_mask)?,
            None => current_mask.clone(),
        };

        let mut record = record.clone();
        record.mask_code = Some(entry_mask.code);
        if stored_code.is_some() {
            record.mask_code = stored_code;
        }

        self.store.upsert_merged(&record)?;
        Ok(record)
    }

    fn historical_mask(
        &self,
        patient_id: &str,
        code: &str,
        current_mask: &Mask,
    ) -> Result<Mask, StoreError> {
        match self.store.get::<Mask>(&patient_key(patient_id, code))? {
            Some(mask) => Ok(mask),
            None => {
                debug!(
                    "Mask {} not stored for patient {}, using current mask",
                    code, patient_id
                );
                Ok(current_mask.clone())
            }
        }
    }

    fn insert<E: Entity>(&self, entity: &E) -> Result<bool, StoreError> {
        let inserted = self.store.insert_if_absent(entity)?;
        if inserted {
            debug!("Stored new {} {}", E::KIND, entity.document_id());
        } else {
            info!("{} {} already stored, skipping", E::KIND, entity.document_id());
        }
        Ok(inserted)
    }
}
