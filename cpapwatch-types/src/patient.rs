//! Patient profile.

/// The account holder whose therapy data is being tracked.
///
/// Inserted once and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Patient {
    /// Vendor patient identifier; the document key.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub id: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub first_name: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub last_name: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub email: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub date_of_birth: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub country_id: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub timezone_id: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string_or_default"))]
    pub gender: String,
    /// Self-reported apnea-hypopnea index.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::number_or_default"))]
    pub user_entered_ahi: f64,
}

impl Patient {
    /// First name plus last initial, e.g. `"Ada L"`.
    pub fn display_name(&self) -> String {
        match self.last_name.chars().next() {
            Some(initial) => format!("{} {}", self.first_name, initial),
            None => format!("{} ", self.first_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let patient = Patient {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            ..Default::default()
        };
        assert_eq!(patient.display_name(), "Ada L");
    }

    #[test]
    fn test_display_name_without_last_name() {
        let patient = Patient {
            first_name: "Ada".into(),
            ..Default::default()
        };
        assert_eq!(patient.display_name(), "Ada ");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_vendor_payload() {
        let json = r#"{
            "id": "00uylx14a9T8huxmW297",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": null,
            "dateOfBirth": "1815-12-10",
            "countryId": "US",
            "timezoneId": "America/New_York",
            "gender": null,
            "userEnteredAhi": null,
            "__typename": "Patient"
        }"#;

        let patient: Patient = serde_json::from_str(json).unwrap();
        assert_eq!(patient.id, "00uylx14a9T8huxmW297");
        assert_eq!(patient.email, "");
        assert_eq!(patient.gender, "");
        assert_eq!(patient.user_entered_ahi, 0.0);
        assert_eq!(patient.timezone_id, "America/New_York");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_null_fields_default() {
        let json = r#"{
            "id": null, "firstName": null, "lastName": null, "email": null,
            "dateOfBirth": null, "countryId": null, "timezoneId": null,
            "gender": null, "userEnteredAhi": null
        }"#;

        let patient: Patient = serde_json::from_str(json).unwrap();
        assert_eq!(patient, Patient::default());
        assert_eq!(patient.display_name(), " ");
    }
}
