//! btleplug-backed discovery and peripheral access.
//!
//! # Platform Differences
//!
//! - **macOS**: peripherals are identified by a CoreBluetooth UUID, which is
//!   stable per Mac but differs between machines. The advertised address is
//!   `00:00:00:00:00:00`.
//! - **Linux/Windows**: peripherals are identified by their Bluetooth MAC
//!   address (e.g. `AA:BB:CC:DD:EE:FF`).
//!
//! The identifier reported by [`BlePeripheral::id`] is whichever of the two
//! the platform provides, and is what ends up in device records.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use neuroglove_types::ReadingKind;
use neuroglove_types::ble::{BATTERY_SERVICE, FLEX_SERVICE};

use crate::config::SessionConfig;
use crate::error::{ConnectionFailureReason, Error, Result};
use crate::peripheral::{Discovery, GlovePeripheral, NotificationStream, SharedPeripheral};

/// How often the adapter's peripheral list is checked while scanning.
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Timeout for GATT service discovery after connecting.
const SERVICE_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a single characteristic read.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters.into_iter().next().ok_or(Error::connection_failed(
        None,
        ConnectionFailureReason::AdapterUnavailable,
    ))
}

/// Format a peripheral ID as a string.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Create an identifier from an address, falling back to the peripheral ID
/// where the platform hides addresses.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if address == "00:00:00:00:00:00" {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

/// Whether a peripheral advertises itself as a NeuroGlove.
fn is_neuroglove(properties: &PeripheralProperties) -> bool {
    let advertises = |uuid: &Uuid| *uuid == FLEX_SERVICE || *uuid == BATTERY_SERVICE;

    if properties.services.iter().any(advertises) || properties.service_data.keys().any(advertises)
    {
        return true;
    }

    properties
        .local_name
        .as_ref()
        .is_some_and(|name| name.to_lowercase().contains("neuroglove"))
}

/// Whether a peripheral matches a user-supplied identifier or name fragment.
fn matches_filter(identifier: &str, name: Option<&str>, filter_lower: &str) -> bool {
    let identifier = identifier.to_lowercase();
    if identifier == filter_lower || identifier.replace(':', "") == filter_lower.replace(':', "") {
        return true;
    }
    name.is_some_and(|n| n.to_lowercase().contains(filter_lower))
}

/// Scan-based discovery over the first Bluetooth adapter.
///
/// Selects the first peripheral that matches the configured filter, or, with
/// no filter, the first one advertising the NeuroGlove flex service or the
/// Battery Service. Nothing found within the scan window is reported as
/// `Ok(None)`.
#[derive(Debug, Clone)]
pub struct BleDiscovery {
    scan_timeout: Duration,
    connect_timeout: Duration,
    filter: Option<String>,
}

impl BleDiscovery {
    /// Create a discovery from session settings.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            scan_timeout: config.scan_timeout,
            connect_timeout: config.connect_timeout,
            filter: config.device_filter.clone(),
        }
    }

    async fn find_match(&self, adapter: &Adapter) -> Result<Option<(Peripheral, String, Option<String>)>> {
        let filter_lower = self.filter.as_ref().map(|f| f.to_lowercase());

        for peripheral in adapter.peripherals().await? {
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };
            let identifier = create_identifier(&props.address.to_string(), &peripheral.id());
            let name = props.local_name.clone();

            let selected = match &filter_lower {
                Some(filter) => matches_filter(&identifier, name.as_deref(), filter),
                None => is_neuroglove(&props),
            };
            if selected {
                debug!(%identifier, ?name, "Matched peripheral");
                return Ok(Some((peripheral, identifier, name)));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Discovery for BleDiscovery {
    #[tracing::instrument(level = "info", skip_all, fields(filter = ?self.filter))]
    async fn request_device(&self) -> Result<Option<SharedPeripheral>> {
        let adapter = get_adapter().await?;

        info!(
            "Scanning for NeuroGlove devices for up to {} seconds...",
            self.scan_timeout.as_secs()
        );
        adapter.start_scan(ScanFilter::default()).await?;

        let deadline = Instant::now() + self.scan_timeout;
        let found = loop {
            match self.find_match(&adapter).await {
                Ok(Some(found)) => break Some(found),
                Ok(None) => {}
                Err(e) => debug!("Error listing peripherals: {}", e),
            }
            if Instant::now() >= deadline {
                break None;
            }
            sleep(SCAN_POLL_INTERVAL).await;
        };

        if let Err(e) = adapter.stop_scan().await {
            debug!("Failed to stop scan: {}", e);
        }

        match found {
            Some((peripheral, identifier, name)) => {
                info!(%identifier, ?name, "Selected device");
                Ok(Some(std::sync::Arc::new(BlePeripheral::new(
                    peripheral,
                    identifier,
                    name,
                    self.connect_timeout,
                ))))
            }
            None => {
                info!("No matching device found");
                Ok(None)
            }
        }
    }
}

/// A NeuroGlove reached through btleplug.
pub struct BlePeripheral {
    peripheral: Peripheral,
    id: String,
    name: Option<String>,
    connect_timeout: Duration,
    characteristics_cache: RwLock<HashMap<Uuid, Characteristic>>,
}

impl std::fmt::Debug for BlePeripheral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlePeripheral")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl BlePeripheral {
    /// Wrap a discovered peripheral.
    pub fn new(
        peripheral: Peripheral,
        id: String,
        name: Option<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            peripheral,
            id,
            name,
            connect_timeout,
            characteristics_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Find a characteristic using the cache built during service discovery.
    async fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        {
            let cache = self.characteristics_cache.read().await;
            if let Some(characteristic) = cache.get(&uuid) {
                return Ok(characteristic.clone());
            }
            if !cache.is_empty() {
                return Err(Error::characteristic_not_found(
                    uuid.to_string(),
                    self.peripheral.services().len(),
                ));
            }
        }

        warn!(
            "Characteristics cache empty, falling back to service search for {}",
            uuid
        );
        let services = self.peripheral.services();
        services
            .iter()
            .flat_map(|service| service.characteristics.iter())
            .find(|c| c.uuid == uuid)
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(uuid.to_string(), services.len()))
    }
}

#[async_trait]
impl GlovePeripheral for BlePeripheral {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[tracing::instrument(level = "info", skip(self), fields(device_id = %self.id))]
    async fn connect(&self) -> Result<()> {
        info!("Connecting to device...");
        timeout(self.connect_timeout, self.peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to device", self.connect_timeout))??;
        info!("Connected!");

        timeout(SERVICE_DISCOVERY_TIMEOUT, self.peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", SERVICE_DISCOVERY_TIMEOUT))??;

        let services = self.peripheral.services();
        debug!("Found {} services", services.len());

        let mut cache = self.characteristics_cache.write().await;
        cache.clear();
        for service in &services {
            debug!("  Service: {}", service.uuid);
            for characteristic in &service.characteristics {
                debug!("    Characteristic: {}", characteristic.uuid);
                cache.insert(characteristic.uuid, characteristic.clone());
            }
        }
        debug!("Cached {} characteristics for fast lookup", cache.len());
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self), fields(device_id = %self.id))]
    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from device...");
        self.characteristics_cache.write().await.clear();
        self.peripheral.disconnect().await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn read_value(&self, kind: ReadingKind) -> Result<Vec<u8>> {
        let characteristic = self.find_characteristic(kind.characteristic()).await?;
        let data = timeout(READ_TIMEOUT, self.peripheral.read(&characteristic))
            .await
            .map_err(|_| Error::timeout(format!("read {} characteristic", kind), READ_TIMEOUT))??;
        Ok(data)
    }

    async fn notifications(&self, kind: ReadingKind) -> Result<NotificationStream> {
        let characteristic = self.find_characteristic(kind.characteristic()).await?;
        self.peripheral.subscribe(&characteristic).await?;

        let uuid = characteristic.uuid;
        let stream = self.peripheral.notifications().await?;
        Ok(Box::pin(stream.filter_map(move |notification| {
            futures::future::ready((notification.uuid == uuid).then_some(notification.value))
        })))
    }

    async fn stop_notifications(&self, kind: ReadingKind) -> Result<()> {
        let characteristic = self.find_characteristic(kind.characteristic()).await?;
        self.peripheral.unsubscribe(&characteristic).await?;
        Ok(())
    }
}
