//! Mask in use with a device.

/// A mask registered to a patient, keyed by `(patient_id, code)`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Mask {
    #[cfg_attr(
        feature = "serde",
        serde(rename = "maskManufacturerName", deserialize_with = "crate::de::string_or_default")
    )]
    pub manufacturer: String,
    /// Vendor mask code, e.g. `mirage-quattro-full-face`.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "maskCode", deserialize_with = "crate::de::string_or_default")
    )]
    pub code: String,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "maskType", deserialize_with = "crate::de::string_or_default")
    )]
    pub mask_type: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub localized_name: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::image_path"))]
    pub image_path: String,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "maskPatientId", deserialize_with = "crate::de::string_or_default")
    )]
    pub patient_id: String,
}
