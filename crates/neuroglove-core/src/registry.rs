//! Device registry client.
//!
//! Records live in the backend; the registry only fetches them and performs
//! the idempotent first-pairing upsert.

use tracing::{info, warn};

use neuroglove_types::{DeviceRecord, display_name};

use crate::api::SharedBackend;
use crate::error::{Error, Result};

/// Client for the backend device registry.
#[derive(Clone)]
pub struct DeviceRegistry {
    backend: SharedBackend,
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry").finish_non_exhaustive()
    }
}

impl DeviceRegistry {
    /// Create a registry client over a backend.
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Fetch every device record of the current identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport or backend failure. Nothing is
    /// retried.
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        Ok(self.backend.list_devices().await?)
    }

    /// Like [`list_devices`](Self::list_devices), but logs a failure and
    /// returns an empty list instead.
    pub async fn list_devices_or_empty(&self) -> Vec<DeviceRecord> {
        match self.list_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "Failed to fetch devices, showing none");
                Vec::new()
            }
        }
    }

    /// Register a device, or return its existing record.
    ///
    /// The backend keys records by `(identity, id)`, so repeating the call is
    /// harmless. A missing or blank `name` is stored as "Unknown Device".
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `id` is empty or whitespace, and
    /// [`Error::Network`] if the backend call fails.
    pub async fn register_device(&self, id: &str, name: Option<&str>) -> Result<DeviceRecord> {
        if id.trim().is_empty() {
            return Err(Error::validation("device id must not be empty"));
        }

        let name = display_name(name);
        let record = self.backend.upsert_device(id, name).await?;
        info!(device_id = %record.id, device_name = %record.name, "Device registered");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mock::MockBackend;

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let backend = Arc::new(MockBackend::new());
        let registry = DeviceRegistry::new(backend.clone());

        let first = registry
            .register_device("abc123", Some("Glove"))
            .await
            .unwrap();
        let second = registry
            .register_device("abc123", Some("Glove"))
            .await
            .unwrap();

        assert_eq!(first, second);
        let devices = registry.list_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "abc123");
    }

    #[tokio::test]
    async fn test_register_rejects_empty_id() {
        let backend = Arc::new(MockBackend::new());
        let registry = DeviceRegistry::new(backend.clone());

        for id in ["", "   "] {
            let err = registry.register_device(id, Some("Glove")).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert_eq!(backend.device_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_defaults_name() {
        let registry = DeviceRegistry::new(Arc::new(MockBackend::new()));
        let record = registry.register_device("dev-1", None).await.unwrap();
        assert_eq!(record.name, "Unknown Device");
    }

    #[tokio::test]
    async fn test_list_devices_failure() {
        let backend = Arc::new(MockBackend::new());
        backend.set_should_fail(true);
        let registry = DeviceRegistry::new(backend);

        assert!(matches!(
            registry.list_devices().await,
            Err(Error::Network(_))
        ));
        assert!(registry.list_devices_or_empty().await.is_empty());
    }
}
