//! Sensor history client.

use tracing::debug;

use neuroglove_types::Reading;

use crate::api::SharedBackend;
use crate::error::Result;

/// Read-only access to persisted readings.
#[derive(Clone)]
pub struct HistoryClient {
    backend: SharedBackend,
}

impl std::fmt::Debug for HistoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryClient").finish_non_exhaustive()
    }
}

impl HistoryClient {
    /// Create a history client over a backend.
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Fetch a device's persisted readings, most recent first.
    ///
    /// Readings with equal timestamps keep the order the backend returned.
    pub async fn fetch_history(&self, device_id: &str) -> Result<Vec<Reading>> {
        let mut readings = self.backend.fetch_readings(device_id).await?;
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        debug!(device_id, count = readings.len(), "Fetched history");
        Ok(readings)
    }
}
