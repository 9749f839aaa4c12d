//! File-based snapshot client.
//!
//! Reads one JSON payload per vendor call from a fixture directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::{FetchError, SnapshotClient};

const DEVICE_FILE: &str = "device.json";
const SLEEP_RECORDS_FILE: &str = "sleep_records.json";
const USER_FILE: &str = "user.json";
const MASK_FILE: &str = "mask.json";

/// A client that reads captured payloads from a directory.
///
/// The directory holds `device.json`, `sleep_records.json`, `user.json` and
/// `mask.json`. Files are re-read on every call, so editing them between
/// cycles behaves like the vendor reporting new data. The history window is
/// not applied; the fixture is returned as captured.
#[derive(Debug)]
pub struct FileClient {
    dir: PathBuf,
    description: String,
    connected: bool,
}

impl FileClient {
    /// Create a new file client for the given fixture directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let description = format!("file: {}", dir.display());
        Self {
            dir,
            description,
            connected: false,
        }
    }

    /// Returns the fixture directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read(&self, name: &'static str) -> Result<Value, FetchError> {
        if !self.connected {
            return Err(FetchError::NotConnected);
        }
        let content = tokio::fs::read_to_string(self.dir.join(name)).await?;
        serde_json::from_str(&content).map_err(|e| FetchError::parse(name, e))
    }
}

#[async_trait]
impl SnapshotClient for FileClient {
    async fn connect(&mut self) -> Result<(), FetchError> {
        let is_dir = tokio::fs::metadata(&self.dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(FetchError::Connection(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        self.connected = true;
        Ok(())
    }

    async fn user_device_data(&mut self) -> Result<Value, FetchError> {
        self.read(DEVICE_FILE).await
    }

    async fn sleep_records(&mut self, _months: u32) -> Result<Value, FetchError> {
        self.read(SLEEP_RECORDS_FILE).await
    }

    async fn user_info(&mut self) -> Result<Value, FetchError> {
        self.read(USER_FILE).await
    }

    async fn mask_info(&mut self) -> Result<Value, FetchError> {
        self.read(MASK_FILE).await
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        self.connected = false;
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}
