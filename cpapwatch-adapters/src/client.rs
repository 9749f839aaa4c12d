//! The snapshot client contract and the collection sequence.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use cpapwatch_types::{Device, Mask, Patient, SleepRecord, Snapshot};

use crate::FetchError;

/// A session against one account's therapy data.
///
/// Payload methods return the raw key/value documents; decoding into typed
/// entities (including asset URL normalization) happens in [`collect`].
#[async_trait]
pub trait SnapshotClient: Send + Sync + Debug {
    /// Open a session. Must be called before any payload method.
    async fn connect(&mut self) -> Result<(), FetchError>;

    /// The currently active device.
    async fn user_device_data(&mut self) -> Result<Value, FetchError>;

    /// Nightly records covering the last `months` months.
    async fn sleep_records(&mut self, months: u32) -> Result<Value, FetchError>;

    /// The patient profile.
    async fn user_info(&mut self) -> Result<Value, FetchError>;

    /// The currently active mask.
    async fn mask_info(&mut self) -> Result<Value, FetchError>;

    /// Release the session.
    async fn close(&mut self) -> Result<(), FetchError>;

    /// Human-readable description of the source, used in logs.
    fn description(&self) -> &str;
}

/// Fetch and decode one snapshot.
///
/// The session is closed even when a payload fails to fetch or decode; the
/// fetch error takes precedence over a close error.
pub async fn collect(
    client: &mut dyn SnapshotClient,
    months: u32,
) -> Result<Snapshot, FetchError> {
    client.connect().await?;

    let fetched = fetch_all(client, months).await;
    let closed = client.close().await;

    let snapshot = fetched?;
    if let Err(e) = closed {
        warn!("Failed to close {}: {}", client.description(), e);
    }
    Ok(snapshot)
}

async fn fetch_all(client: &mut dyn SnapshotClient, months: u32) -> Result<Snapshot, FetchError> {
    let device: Device = decode("device", client.user_device_data().await?)?;
    let sleep_records = decode_records(client.sleep_records(months).await?)?;
    let patient: Patient = decode("user", client.user_info().await?)?;
    let mask: Mask = decode("mask", client.mask_info().await?)?;

    debug!(
        "Fetched {} sleep records for patient {} from {}",
        sleep_records.len(),
        patient.id,
        client.description()
    );

    Ok(Snapshot::builder()
        .patient(patient)
        .device(device)
        .mask(mask)
        .records(sleep_records)
        .build())
}

fn decode<T: DeserializeOwned>(payload: &'static str, value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::parse(payload, e))
}

fn decode_records(value: Value) -> Result<Vec<SleepRecord>, FetchError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => decode("sleep records", value),
        other => Err(FetchError::parse(
            "sleep records",
            format!("expected an array, got {}", type_name(&other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// In-memory client recording which calls were made.
    #[derive(Debug, Default)]
    struct ScriptedClient {
        connected: bool,
        closed: bool,
        fail_mask: bool,
        months_requested: Option<u32>,
        records: Value,
    }

    #[async_trait]
    impl SnapshotClient for ScriptedClient {
        async fn connect(&mut self) -> Result<(), FetchError> {
            self.connected = true;
            Ok(())
        }

        async fn user_device_data(&mut self) -> Result<Value, FetchError> {
            Ok(json!({
                "serialNumber": "23191427249",
                "imagePath": "v1/flowgens/as10.png",
                "fgDevicePatientId": "P1"
            }))
        }

        async fn sleep_records(&mut self, months: u32) -> Result<Value, FetchError> {
            self.months_requested = Some(months);
            Ok(self.records.clone())
        }

        async fn user_info(&mut self) -> Result<Value, FetchError> {
            Ok(json!({ "id": "P1", "firstName": "Ada", "lastName": "Lovelace" }))
        }

        async fn mask_info(&mut self) -> Result<Value, FetchError> {
            if self.fail_mask {
                return Err(FetchError::Http("API returned status 500".into()));
            }
            Ok(json!({ "maskCode": "airfit-f20", "maskPatientId": "P1" }))
        }

        async fn close(&mut self) -> Result<(), FetchError> {
            self.closed = true;
            Ok(())
        }

        fn description(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_collect_decodes_payloads() {
        let mut client = ScriptedClient {
            records: json!([
                { "startDate": "2025-08-01", "sleepScore": 85, "sleepRecordPatientId": "P1" },
                { "startDate": "2025-08-02", "sleepScore": 0, "sleepRecordPatientId": "P1" }
            ]),
            ..Default::default()
        };

        let snapshot = collect(&mut client, 3).await.unwrap();

        assert!(client.connected);
        assert!(client.closed);
        assert_eq!(client.months_requested, Some(3));
        assert_eq!(snapshot.patient.id, "P1");
        assert_eq!(snapshot.device.serial_number, "23191427249");
        assert_eq!(
            snapshot.device.image_path,
            "https://static.myair-prd.dht.live/v1/flowgens/as10.png"
        );
        assert_eq!(snapshot.mask.code, "airfit-f20");
        assert_eq!(snapshot.sleep_records.len(), 2);
    }

    #[tokio::test]
    async fn test_collect_null_records_is_empty() {
        let mut client = ScriptedClient::default();
        let snapshot = collect(&mut client, 1).await.unwrap();
        assert!(snapshot.sleep_records.is_empty());
    }

    #[tokio::test]
    async fn test_collect_closes_on_failure() {
        let mut client = ScriptedClient {
            fail_mask: true,
            ..Default::default()
        };

        let err = collect(&mut client, 1).await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
        assert!(client.closed);
    }

    #[tokio::test]
    async fn test_collect_rejects_non_array_records() {
        let mut client = ScriptedClient {
            records: json!({ "startDate": "2025-08-01" }),
            ..Default::default()
        };

        let err = collect(&mut client, 1).await.unwrap_err();
        assert!(err.to_string().contains("expected an array, got an object"));
    }
}
