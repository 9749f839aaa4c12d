//! Flow generator (CPAP device).

use chrono::{DateTime, NaiveDate};

/// A CPAP device registered to a patient.
///
/// Keyed by `(patient_id, serial_number)`. Only `last_sleep_data_report_time`
/// is expected to move between polls, but stored rows are never updated.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Device {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub serial_number: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub device_type: String,
    /// RFC 3339 timestamp of the last upload, e.g. `2025-08-07T13:26:36.000+00:00`.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub last_sleep_data_report_time: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub localized_name: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::image_path"))]
    pub image_path: String,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "fgDeviceManufacturerName", deserialize_with = "crate::de::string_or_default")
    )]
    pub manufacturer: String,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "fgDevicePatientId", deserialize_with = "crate::de::string_or_default")
    )]
    pub patient_id: String,
}

impl Device {
    /// Calendar date of the last upload, in the timestamp's own offset.
    ///
    /// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date; anything
    /// else reads as no report.
    pub fn last_report_date(&self) -> Option<String> {
        let raw = self.last_sleep_data_report_time.as_str();
        let date = match DateTime::parse_from_rfc3339(raw) {
            Ok(timestamp) => timestamp.date_naive(),
            Err(_) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?,
        };
        Some(date.format("%Y-%m-%d").to_string())
    }
}
