//! Lenient field deserializers for vendor payloads.
//!
//! Upstream sends `null` for fields it has no value for; those collapse to
//! the field's default instead of failing the whole payload.

use serde::{Deserialize, Deserializer};

use crate::normalize_image_path;

pub(crate) fn string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn number_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A count or score. Accepts any JSON number; fractions round, negatives
/// and `null` become zero.
pub(crate) fn count_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or_default();
    if !value.is_finite() || value <= 0.0 {
        return Ok(0);
    }
    Ok(value.round().min(f64::from(u32::MAX)) as u32)
}

pub(crate) fn image_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(normalize_image_path(&raw))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Counts {
        #[serde(deserialize_with = "super::count_or_default", default)]
        n: u32,
    }

    fn count(json: &str) -> u32 {
        serde_json::from_str::<Counts>(json).unwrap().n
    }

    #[test]
    fn test_count_accepts_any_number() {
        assert_eq!(count(r#"{"n": 85}"#), 85);
        assert_eq!(count(r#"{"n": 85.0}"#), 85);
        assert_eq!(count(r#"{"n": 84.6}"#), 85);
        assert_eq!(count(r#"{"n": -3}"#), 0);
        assert_eq!(count(r#"{"n": null}"#), 0);
        assert_eq!(count("{}"), 0);
        assert_eq!(count(r#"{"n": 1e12}"#), u32::MAX);
    }

    #[test]
    fn test_count_rejects_strings() {
        assert!(serde_json::from_str::<Counts>(r#"{"n": "85"}"#).is_err());
    }
}
