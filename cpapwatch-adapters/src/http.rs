//! HTTP snapshot client.
//!
//! Talks to a REST bridge that fronts the vendor cloud API. The bridge owns
//! the vendor's OAuth dance; this client only exchanges account credentials
//! for a bearer token and then reads the four payloads.
//!
//! ## Endpoints
//!
//! - `POST /login` with `{username, password, region, deviceToken}` returning
//!   `{"accessToken": "..."}`
//! - `GET /device`, `GET /sleep-records?months=N`, `GET /user`, `GET /mask`
//!
//! ## Example
//!
//! ```rust,no_run
//! use cpapwatch_adapters::collect;
//! use cpapwatch_adapters::http::HttpClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = HttpClient::builder()
//!         .endpoint("http://localhost:8080")
//!         .credentials("ada@example.com", "secret")
//!         .region("EU")
//!         .build()?;
//!
//!     let snapshot = collect(&mut client, 3).await?;
//!     println!("Active device: {}", snapshot.device.serial_number);
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{FetchError, SnapshotClient};

const DEFAULT_ENDPOINT: &str = "http://localhost:8080";
const DEFAULT_REGION: &str = "NA";

/// Client for the vendor REST bridge.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
    region: String,
    device_token: Option<String>,
    description: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    async fn get(&self, path: &str, payload: &'static str) -> Result<Value, FetchError> {
        let token = self.token.as_deref().ok_or(FetchError::NotConnected)?;
        let url = format!("{}{}", self.endpoint, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let response = check_status(response)?;

        response
            .json()
            .await
            .map_err(|e| FetchError::parse(payload, e))
    }
}

// Credentials stay out of logs.
impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("region", &self.region)
            .field("connected", &self.token.is_some())
            .finish()
    }
}

#[async_trait]
impl SnapshotClient for HttpClient {
    async fn connect(&mut self) -> Result<(), FetchError> {
        let url = format!("{}/login", self.endpoint);
        let request = LoginRequest {
            username: &self.username,
            password: &self.password,
            region: &self.region,
            device_token: self.device_token.as_deref(),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let login: LoginResponse = check_status(response)?
            .json()
            .await
            .map_err(|e| FetchError::parse("login", e))?;

        if login.access_token.is_empty() {
            return Err(FetchError::Auth("Empty access token".to_string()));
        }
        self.token = Some(login.access_token);
        Ok(())
    }

    async fn user_device_data(&mut self) -> Result<Value, FetchError> {
        self.get("/device", "device").await
    }

    async fn sleep_records(&mut self, months: u32) -> Result<Value, FetchError> {
        self.get(&format!("/sleep-records?months={}", months), "sleep records")
            .await
    }

    async fn user_info(&mut self) -> Result<Value, FetchError> {
        self.get("/user", "user").await
    }

    async fn mask_info(&mut self) -> Result<Value, FetchError> {
        self.get("/mask", "mask").await
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        self.token = None;
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

fn check_status(response: Response) -> Result<Response, FetchError> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(FetchError::Auth("Invalid credentials".to_string()))
        }
        status if !status.is_success() => {
            Err(FetchError::Http(format!("API returned status {}", status)))
        }
        _ => Ok(response),
    }
}

/// Builder for HttpClient.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    endpoint: Option<String>,
    username: Option<String>,
    password: Option<String>,
    region: Option<String>,
    device_token: Option<String>,
    timeout: Option<Duration>,
}

impl HttpClientBuilder {
    /// Set the bridge base URL (e.g., "http://localhost:8080").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the account username and password.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the account region (default: "NA").
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set a remembered-device token to skip MFA on login.
    pub fn device_token(mut self, token: impl Into<String>) -> Self {
        self.device_token = Some(token.into());
        self
    }

    /// Set the request timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient, FetchError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(30));
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        let username = self.username.unwrap_or_default();
        let description = format!("http: {} ({})", endpoint, username);

        Ok(HttpClient {
            client,
            endpoint,
            username,
            password: self.password.unwrap_or_default(),
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            device_token: self.device_token,
            description,
            token: None,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    region: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = HttpClient::builder().build().unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080");
        assert_eq!(client.region, "NA");
        assert!(client.device_token.is_none());
        assert!(client.token.is_none());
    }

    #[test]
    fn test_builder_custom() {
        let client = HttpClient::builder()
            .endpoint("https://bridge.local/api/")
            .credentials("ada@example.com", "secret")
            .region("EU")
            .device_token("dt-123")
            .build()
            .unwrap();

        assert_eq!(client.endpoint, "https://bridge.local/api");
        assert_eq!(client.username, "ada@example.com");
        assert_eq!(client.password, "secret");
        assert_eq!(client.region, "EU");
        assert_eq!(client.device_token.as_deref(), Some("dt-123"));
        assert_eq!(client.description(), "http: https://bridge.local/api (ada@example.com)");
    }

    #[test]
    fn test_debug_hides_password() {
        let client = HttpClient::builder()
            .credentials("ada@example.com", "hunter2")
            .build()
            .unwrap();
        assert!(!format!("{:?}", client).contains("hunter2"));
    }

    #[test]
    fn test_login_request_shape() {
        let request = LoginRequest {
            username: "ada",
            password: "pw",
            region: "NA",
            device_token: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["region"], "NA");
        assert!(json.get("deviceToken").is_none());
    }

    #[tokio::test]
    async fn test_get_before_connect() {
        let mut client = HttpClient::builder().build().unwrap();
        let err = client.user_info().await.unwrap_err();
        assert!(matches!(err, FetchError::NotConnected));
    }
}
