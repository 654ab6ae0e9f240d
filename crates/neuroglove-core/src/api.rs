//! Backend REST API access.
//!
//! The [`Backend`] trait is the seam between the session components and the
//! NeuroGlove backend. [`HttpBackend`] implements it over `reqwest`;
//! [`crate::mock::MockBackend`] implements it in memory for tests.
//!
//! # Example
//!
//! ```no_run
//! use neuroglove_core::api::{Backend, HttpBackend};
//! use neuroglove_core::ApiConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = HttpBackend::new(&ApiConfig::new("http://localhost:8001").credential("token"))?;
//!
//! for device in backend.list_devices().await? {
//!     println!("{} ({})", device.name, device.id);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, warn};

use neuroglove_types::{DeviceRecord, Reading};

use crate::config::ApiConfig;
use crate::wire::{
    DeviceList, RegisterDevice, RegisteredDevice, SensorDataList, SensorDataUpload,
    decode_history_doc,
};

/// Error type for backend operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The backend is not reachable.
    #[error("Backend not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The backend refused to serve the call (used by in-memory backends).
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Result type for backend operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Operations the session components need from the backend.
///
/// Every call is made on behalf of the identity carried by the backend's
/// credential; implementations never interpret it.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch all device records of the current identity.
    async fn list_devices(&self) -> ApiResult<Vec<DeviceRecord>>;

    /// Create the record for `(identity, id)` if it does not exist yet and
    /// return the stored record.
    async fn upsert_device(&self, id: &str, name: &str) -> ApiResult<DeviceRecord>;

    /// Persist one reading.
    async fn save_reading(&self, reading: &Reading) -> ApiResult<()>;

    /// Fetch persisted readings of a device. Undecodable documents are skipped.
    async fn fetch_readings(&self, device_id: &str) -> ApiResult<Vec<Reading>>;
}

/// A backend shared between the components of one client.
pub type SharedBackend = Arc<dyn Backend>;

/// HTTP client for the NeuroGlove backend API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    credential: Option<String>,
}

fn normalize_base_url(base_url: &str) -> ApiResult<String> {
    let base_url = base_url.trim().trim_end_matches('/').to_string();

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ApiError::InvalidUrl(format!(
            "URL must start with http:// or https://, got: {}",
            base_url
        )));
    }
    Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;

    Ok(base_url)
}

impl HttpBackend {
    /// Create a backend client from API settings.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::Request)?;

        Self::with_client(config, client)
    }

    /// Create a backend client with a custom reqwest Client.
    pub fn with_client(config: &ApiConfig, client: Client) -> ApiResult<Self> {
        let base_url = normalize_base_url(&config.base_url)?;

        Ok(Self {
            client,
            base_url,
            credential: config.credential.clone(),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `<base_url>/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(format!("cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            Some(credential) => request.bearer_auth(credential),
            None => request,
        }
    }

    // ======================================================================
    // Internal HTTP helpers
    // ======================================================================

    async fn get<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| ApiError::NotReachable {
                url: url.to_string(),
                source: e,
            })?;

        self.handle_response(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> ApiResult<T> {
        let response = self
            .authorize(self.client.post(url.clone()))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::NotReachable {
                url: url.to_string(),
                source: e,
            })?;

        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ApiResult<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
        } else {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| {
                    ["detail", "error"]
                        .iter()
                        .find_map(|key| v.get(key).and_then(|e| e.as_str()).map(String::from))
                })
                .unwrap_or_else(|| status.to_string());

            Err(ApiError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_devices(&self) -> ApiResult<Vec<DeviceRecord>> {
        let url = self.endpoint(&["api", "devices"])?;
        let list: DeviceList = self.get(url).await?;
        Ok(list.devices.into_iter().map(|d| d.into_record()).collect())
    }

    async fn upsert_device(&self, id: &str, name: &str) -> ApiResult<DeviceRecord> {
        let url = self.endpoint(&["api", "devices"])?;
        let body = RegisterDevice {
            device_id: id,
            device_name: name,
        };
        let registered: RegisteredDevice = self.post_json(url, &body).await?;
        Ok(registered.device.into_record())
    }

    async fn save_reading(&self, reading: &Reading) -> ApiResult<()> {
        let url = self.endpoint(&["api", "sensor-data"])?;
        let _: IgnoredAny = self
            .post_json(url, &SensorDataUpload::new(reading))
            .await?;
        debug!(device_id = %reading.device_id, kind = %reading.kind(), "Reading persisted");
        Ok(())
    }

    async fn fetch_readings(&self, device_id: &str) -> ApiResult<Vec<Reading>> {
        let url = self.endpoint(&["api", "sensor-data", device_id])?;
        let list: SensorDataList = self.get(url).await?;

        let readings = list
            .data
            .iter()
            .filter_map(|doc| match decode_history_doc(device_id, doc) {
                Ok(reading) => Some(reading),
                Err(reason) => {
                    warn!(device_id, %reason, "Skipping undecodable sensor-data document");
                    None
                }
            })
            .collect();
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let backend = HttpBackend::new(&ApiConfig::new("http://localhost:8001"));
        assert!(backend.is_ok());

        let backend = backend.unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8001");
    }

    #[test]
    fn test_client_normalizes_url() {
        let backend = HttpBackend::new(&ApiConfig::new("http://localhost:8001/")).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8001");
    }

    #[test]
    fn test_client_invalid_url() {
        let result = HttpBackend::new(&ApiConfig::new("localhost:8001"));
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_endpoint_percent_encodes_device_id() {
        let backend = HttpBackend::new(&ApiConfig::new("http://localhost:8001/")).unwrap();
        let url = backend
            .endpoint(&["api", "sensor-data", "AA:BB/CC DD"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8001/api/sensor-data/AA:BB%2FCC%20DD"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let backend = HttpBackend::new(&ApiConfig::new("https://example.com/glove")).unwrap();
        let url = backend.endpoint(&["api", "devices"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/glove/api/devices");
    }

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 401,
            message: "Not authenticated".to_string(),
        };
        assert_eq!(err.to_string(), "API error (401): Not authenticated");
    }
}
