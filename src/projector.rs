//! Projection of reconciled state onto gauges.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use cpapwatch_sdk::{Gauge, Registry, SinkError};
use cpapwatch_types::{Device, Mask, SleepRecord, Snapshot};

use crate::error::CycleError;
use crate::reconcile::Reconciled;
use crate::store::{Store, StoreExt};

const RECORD_LABELS: [&str; 4] = ["patient", "device", "date", "mask"];

type RecordValue = fn(&SleepRecord) -> f64;

/// Per-night gauges: name, help, and the record field they publish.
const RECORD_GAUGES: [(&str, &str, RecordValue); 9] = [
    (
        "score",
        "myAir calculates your score by analyzing your nightly therapy data. The higher your score, the better. You get points based on the following four key categories: usage, mask seal, events, and mask on/off. The maximum score you can get is 100 points.",
        |r: &SleepRecord| f64::from(r.sleep_score),
    ),
    (
        "usage_seconds",
        "The MyAir usage time in seconds",
        |r: &SleepRecord| r.usage_seconds() as f64,
    ),
    (
        "usage_score",
        "The point system for usage is calculated in hours and minutes. If you use your therapy for 1 hour you get 10 points, or for 2.3 hours (2 hours, 18 minutes) you get 23 points. The more time you use your therapy, the more points you receive, up to a maximum of 70 points.",
        |r: &SleepRecord| f64::from(r.usage_score),
    ),
    (
        "mask_seal",
        "The better your mask seal, the more points you get. This category can help you know if you need to adjust or change your mask to get a better fit. If your mask seal is poor, it can affect your comfort and the quality of your treatment. Your score reduces as your mask leak increases. You can get up to 20 points for minimal mask leak, 10 to 15 points for moderate leak, and 0 to 10 points for higher leak.",
        |r: &SleepRecord| r.leak_percentile,
    ),
    (
        "mask_seal_score",
        "Your score reduces as your mask leak increases. You can get up to 20 points for minimal mask leak, 10 to 15 points for moderate leak, and 0 to 10 points for higher leak.",
        |r: &SleepRecord| f64::from(r.leak_score),
    ),
    (
        "mask_onoff_count",
        "The MyAir mask on/off status. The fewer times you take your mask on and off throughout the night, the more points you get. Everyone has to take their mask on and off one time during treatment. So, for example, if you remove your mask one or two times, you get 5 points. However, if you take your mask on and off several times, it can indicate a problem with mask fit or with your sleep in general.",
        |r: &SleepRecord| f64::from(r.mask_pair_count),
    ),
    (
        "mask_onoff_score",
        "The MyAir mask on/off score. The fewer times you take your mask on and off throughout the night, the more points you get. 1-2: 5 points, 3: 4 points, 4: 3 points, 5: 2 points, 6 or more: 0 points.",
        |r: &SleepRecord| f64::from(r.mask_score),
    ),
    (
        "ahi",
        "Your CPAP machine notes the number of breathing events you have in each hour. This number can help measure how well your treatment is working. When you have an apnea, air stops flowing to your lungs for 10 seconds or longer -- that is, you actually stop breathing.",
        |r: &SleepRecord| r.ahi,
    ),
    (
        "ahi_score",
        "The fewer breathing events you have each hour, the more points you get. These breathing events are also known as the apnea-hypopnea index (or AHI). myAir measures how many times your breathing partially or fully stops each hour. If you have minimal events, you get 4 to 5 points.",
        |r: &SleepRecord| f64::from(r.ahi_score),
    ),
];

/// Owns every gauge handle and publishes one cycle's state into them.
///
/// Built once per process against a shared [`Registry`]; the exporter
/// serves the same registry.
#[derive(Debug)]
pub struct MetricsProjector {
    registry: Arc<Registry>,
    patient: Gauge,
    device: Gauge,
    mask: Gauge,
    records: Vec<(Gauge, RecordValue)>,
    total_days_count: Gauge,
    total_usage_seconds: Gauge,
}

impl MetricsProjector {
    /// Register every gauge family on `registry`.
    pub fn new(registry: Arc<Registry>) -> Result<Self, SinkError> {
        let patient = registry.gauge(
            "patient",
            "A reference metric for the patient to be used in other metrics",
            &["id", "name", "ahi"],
        )?;
        let device = registry.gauge(
            "device",
            "A reference metric for the device to be used in other metrics",
            &[
                "serialNumber",
                "manufacturer",
                "type",
                "name",
                "image",
                "lastReportDate",
                "patient",
            ],
        )?;
        let mask = registry.gauge(
            "mask",
            "A reference metric for the mask to be used in other metrics",
            &["patient", "code", "name", "type", "image"],
        )?;

        let records = RECORD_GAUGES
            .iter()
            .map(|(name, help, value)| {
                registry
                    .gauge(name, help, &RECORD_LABELS)
                    .map(|gauge| (gauge, *value))
            })
            .collect::<Result<Vec<_>, SinkError>>()?;

        let total_days_count = registry.gauge(
            "total_days_count",
            "Total number of days the user has been using any device.",
            &["patient", "device", "mask", "lastReportDate"],
        )?;
        let total_usage_seconds = registry.gauge(
            "total_usage_seconds",
            "Total usage time of any device in seconds.",
            &["patient"],
        )?;

        Ok(Self {
            registry,
            patient,
            device,
            mask,
            records,
            total_days_count,
            total_usage_seconds,
        })
    }

    /// The registry the gauges live in.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Publish one cycle.
    ///
    /// Per-night gauges cover only this snapshot's records; aggregates and
    /// the device/mask presence gauges are computed from the store. `now` is
    /// the cycle time used for the "yesterday" fallback.
    pub fn project(
        &self,
        snapshot: &Snapshot,
        reconciled: &Reconciled,
        store: &dyn Store,
        include_zero_scores: bool,
        now: DateTime<Utc>,
    ) -> Result<(), CycleError> {
        let active_serial = snapshot.device.serial_number.as_str();

        let mut published = 0;
        for record in &reconciled.records {
            if record.is_zero_score() && !include_zero_scores {
                continue;
            }
            self.project_record(record, active_serial)?;
            published += 1;
        }
        debug!(
            "Published {} of {} nights for patient {}",
            published,
            reconciled.records.len(),
            snapshot.patient_id()
        );

        let patient_id = snapshot.patient_id();
        let last_report_date = store
            .last_report_date(patient_id)?
            .unwrap_or_else(|| yesterday(now));

        let patient = &snapshot.patient;
        self.patient.set(
            &[
                &patient.id,
                &patient.display_name(),
                &patient.user_entered_ahi.to_string(),
            ],
            1.0,
        )?;

        for device in store.list::<Device>()? {
            let active = device.serial_number == active_serial;
            let report_date = if active {
                last_report_date.clone()
            } else {
                device.last_report_date().unwrap_or_default()
            };
            self.device.set(
                &[
                    &device.serial_number,
                    &device.manufacturer,
                    &device.device_type,
                    &device.localized_name,
                    &device.image_path,
                    &report_date,
                    &device.patient_id,
                ],
                flag(active),
            )?;
        }

        let usage_seconds = store.total_usage_seconds(patient_id)?;
        self.total_usage_seconds.clear();
        self.total_usage_seconds
            .set(&[patient_id], usage_seconds as f64)?;

        for mask in store.list::<Mask>()? {
            let active = mask.code == snapshot.mask.code;
            self.mask.set(
                &[
                    &mask.patient_id,
                    &mask.code,
                    &mask.localized_name,
                    &mask.mask_type,
                    &mask.image_path,
                ],
                flag(active),
            )?;
        }

        let total_days = store.total_days_count(patient_id, include_zero_scores)?;
        self.total_days_count.clear();
        self.total_days_count.set(
            &[
                patient_id,
                active_serial,
                &snapshot.mask.code,
                &last_report_date,
            ],
            total_days as f64,
        )?;

        Ok(())
    }

    fn project_record(&self, record: &SleepRecord, device: &str) -> Result<(), SinkError> {
        let labels = [
            record.patient_id.as_str(),
            device,
            record.start_date.as_str(),
            record.mask_code.as_deref().unwrap_or(""),
        ];
        for (gauge, value) in &self.records {
            gauge.set(&labels, value(record))?;
        }
        Ok(())
    }
}

fn flag(active: bool) -> f64 {
    if active {
        1.0
    } else {
        0.0
    }
}

/// ISO date of the day before `now`.
fn yesterday(now: DateTime<Utc>) -> String {
    (now - Duration::days(1)).format("%Y-%m-%d").to_string()
}
