//! Nightly therapy summary.

/// One night of therapy, keyed by `(patient_id, start_date)`.
///
/// Unlike the other entities, sleep records are mutable: the vendor may
/// backfill or correct recent nights, so every poll merges into the stored
/// row. The `mask_code` attribution is the exception and sticks once set.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct SleepRecord {
    /// ISO calendar date of the night (`YYYY-MM-DD`).
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub start_date: String,
    /// Usage in minutes.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::count_or_default"))]
    pub total_usage: u32,
    /// Composite score out of 100.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::count_or_default"))]
    pub sleep_score: u32,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::count_or_default"))]
    pub usage_score: u32,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::count_or_default"))]
    pub ahi_score: u32,
    /// Mask on/off score.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::count_or_default"))]
    pub mask_score: u32,
    /// Mask seal score.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::count_or_default"))]
    pub leak_score: u32,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::number_or_default"))]
    pub ahi: f64,
    /// Number of times the mask was put on and taken off.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::count_or_default"))]
    pub mask_pair_count: u32,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::number_or_default"))]
    pub leak_percentile: f64,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "sleepRecordPatientId", deserialize_with = "crate::de::string_or_default")
    )]
    pub patient_id: String,
    /// Mask in use on this night, attributed during reconciliation.
    pub mask_code: Option<String>,
}

impl SleepRecord {
    /// Create an empty record for a patient and night.
    pub fn new(patient_id: impl Into<String>, start_date: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            start_date: start_date.into(),
            ..Default::default()
        }
    }

    /// Usage converted from upstream minutes to seconds.
    pub fn usage_seconds(&self) -> u64 {
        u64::from(self.total_usage) * 60
    }

    /// Nights with a zero composite score are stored but usually not published.
    pub fn is_zero_score(&self) -> bool {
        self.sleep_score == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_seconds() {
        let record = SleepRecord {
            total_usage: 452,
            ..SleepRecord::new("P1", "2025-08-01")
        };
        assert_eq!(record.usage_seconds(), 27_120);
    }

    #[test]
    fn test_is_zero_score() {
        let mut record = SleepRecord::new("P1", "2025-08-01");
        assert!(record.is_zero_score());
        record.sleep_score = 1;
        assert!(!record.is_zero_score());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_vendor_payload() {
        let json = r#"{
            "startDate": "2025-08-01",
            "totalUsage": 452,
            "sleepScore": 85,
            "usageScore": 68,
            "ahiScore": 5,
            "maskScore": 5,
            "leakScore": 20,
            "ahi": 1.2,
            "maskPairCount": 1,
            "leakPercentile": 3.4,
            "sleepRecordPatientId": "00uylx14a9T8huxmW297",
            "__typename": "SleepRecord"
        }"#;

        let record: SleepRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.start_date, "2025-08-01");
        assert_eq!(record.sleep_score, 85);
        assert_eq!(record.leak_percentile, 3.4);
        assert_eq!(record.patient_id, "00uylx14a9T8huxmW297");
        assert_eq!(record.mask_code, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialized_document_keeps_null_mask_code() {
        let record = SleepRecord::new("P1", "2025-08-01");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("maskCode").unwrap().is_null());
        assert_eq!(value["sleepRecordPatientId"], "P1");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_null_and_fractional_fields() {
        let json = r#"{
            "startDate": null,
            "totalUsage": 452.0,
            "sleepScore": 85.0,
            "usageScore": null,
            "ahiScore": 4.6,
            "maskScore": null,
            "leakScore": null,
            "ahi": null,
            "maskPairCount": 2.0,
            "leakPercentile": null,
            "sleepRecordPatientId": null,
            "maskCode": null
        }"#;

        let record: SleepRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.start_date, "");
        assert_eq!(record.patient_id, "");
        assert_eq!(record.total_usage, 452);
        assert_eq!(record.sleep_score, 85);
        assert_eq!(record.usage_score, 0);
        assert_eq!(record.ahi_score, 5);
        assert_eq!(record.mask_pair_count, 2);
        assert_eq!(record.ahi, 0.0);
        assert_eq!(record.mask_code, None);
    }
}
