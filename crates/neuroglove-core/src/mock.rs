//! Mock peripheral, discovery and backend implementations for testing.
//!
//! These allow sessions to be driven end to end without BLE hardware or a
//! running backend. The CLI's `--demo` mode uses them as well.
//!
//! # Features
//!
//! - **Notification injection**: Push raw values to a subscribed [`MockPeripheral`]
//! - **Failure injection**: Fail connects, missing characteristics, failing backend calls
//! - **Latency simulation**: Add artificial delays to connects and backend calls

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use neuroglove_types::{DeviceRecord, Reading, ReadingKind};

use crate::api::{ApiError, ApiResult, Backend};
use crate::error::{ConnectionFailureReason, Error, Result};
use crate::peripheral::{Discovery, GlovePeripheral, NotificationStream, SharedPeripheral};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ==========================================================================
// MockPeripheral
// ==========================================================================

/// A mock NeuroGlove peripheral.
///
/// # Example
///
/// ```
/// use neuroglove_core::mock::MockPeripheral;
/// use neuroglove_core::GlovePeripheral;
/// use neuroglove_types::ReadingKind;
///
/// #[tokio::main]
/// async fn main() {
///     let glove = MockPeripheral::new("AA:BB:CC:DD:EE:FF", Some("NeuroGlove"));
///     glove.connect().await.unwrap();
///
///     let _stream = glove.notifications(ReadingKind::FlexMulti).await.unwrap();
///     assert!(glove.notify(ReadingKind::FlexMulti, &[10, 20, 30, 40, 50]));
/// }
/// ```
pub struct MockPeripheral {
    id: String,
    name: Option<String>,
    characteristics: HashSet<ReadingKind>,
    connected: AtomicBool,
    values: RwLock<HashMap<ReadingKind, Vec<u8>>>,
    subscribers: Mutex<HashMap<ReadingKind, UnboundedSender<Vec<u8>>>>,
    should_fail: AtomicBool,
    /// Simulated connect latency in milliseconds (0 = no delay).
    connect_latency_ms: AtomicU64,
    connect_count: AtomicU32,
    disconnect_count: AtomicU32,
    stop_count: AtomicU32,
}

impl std::fmt::Debug for MockPeripheral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPeripheral")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("characteristics", &self.characteristics)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockPeripheral {
    /// Create a mock peripheral exposing both battery and flex characteristics.
    pub fn new(id: &str, name: Option<&str>) -> Self {
        MockPeripheralBuilder::new().id(id).name(name).build()
    }

    /// Create a builder for custom mock peripherals.
    pub fn builder() -> MockPeripheralBuilder {
        MockPeripheralBuilder::new()
    }

    /// Push a raw value to the subscriber of `kind`.
    ///
    /// Returns `false` if nobody is subscribed.
    pub fn notify(&self, kind: ReadingKind, value: &[u8]) -> bool {
        lock(&self.subscribers)
            .get(&kind)
            .is_some_and(|tx| tx.unbounded_send(value.to_vec()).is_ok())
    }

    /// Whether notifications for `kind` are enabled.
    pub fn has_subscriber(&self, kind: ReadingKind) -> bool {
        lock(&self.subscribers).contains_key(&kind)
    }

    /// Close the notification stream of `kind`, as a peripheral going out of
    /// range would.
    pub fn end_notifications(&self, kind: ReadingKind) {
        lock(&self.subscribers).remove(&kind);
    }

    /// Set the value returned by reads of `kind`.
    pub async fn set_value(&self, kind: ReadingKind, value: Vec<u8>) {
        self.values.write().await.insert(kind, value);
    }

    /// Make subsequent connects fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Set simulated connect latency.
    pub fn set_connect_latency(&self, latency: Duration) {
        self.connect_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Drop the transport connection without a disconnect call.
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    /// Number of connect attempts.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::Relaxed)
    }

    /// Number of disconnect calls, including ones that reported an error.
    pub fn disconnect_count(&self) -> u32 {
        self.disconnect_count.load(Ordering::Relaxed)
    }

    /// Number of times notifications were disabled.
    pub fn stop_count(&self) -> u32 {
        self.stop_count.load(Ordering::Relaxed)
    }

    fn check_connected(&self) -> Result<()> {
        if !self.connected.load(Ordering::Relaxed) {
            Err(Error::NotConnected)
        } else {
            Ok(())
        }
    }

    fn check_characteristic(&self, kind: ReadingKind) -> Result<()> {
        if self.characteristics.contains(&kind) {
            Ok(())
        } else {
            Err(Error::characteristic_not_found(
                kind.characteristic().to_string(),
                self.characteristics.len(),
            ))
        }
    }
}

#[async_trait]
impl GlovePeripheral for MockPeripheral {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn connect(&self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::Relaxed);

        let latency = self.connect_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::connection_failed(
                Some(self.id.clone()),
                ConnectionFailureReason::BleError("Mock failure".to_string()),
            ));
        }
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_count.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscribers).clear();
        if !self.connected.swap(false, Ordering::Relaxed) {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn read_value(&self, kind: ReadingKind) -> Result<Vec<u8>> {
        self.check_connected()?;
        self.check_characteristic(kind)?;
        Ok(self
            .values
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    async fn notifications(&self, kind: ReadingKind) -> Result<NotificationStream> {
        self.check_connected()?;
        self.check_characteristic(kind)?;

        let (tx, rx) = unbounded();
        lock(&self.subscribers).insert(kind, tx);
        Ok(Box::pin(rx))
    }

    async fn stop_notifications(&self, kind: ReadingKind) -> Result<()> {
        self.stop_count.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscribers).remove(&kind);
        Ok(())
    }
}

/// Builder for creating mock peripherals with custom settings.
#[derive(Debug)]
pub struct MockPeripheralBuilder {
    id: String,
    name: Option<String>,
    characteristics: HashSet<ReadingKind>,
    battery: u8,
    flex: [u8; 5],
}

impl Default for MockPeripheralBuilder {
    fn default() -> Self {
        Self {
            id: format!("MOCK-{:06X}", rand::random::<u32>() % 0xFFFFFF),
            name: Some("NeuroGlove Mock".to_string()),
            characteristics: HashSet::from([ReadingKind::Battery, ReadingKind::FlexMulti]),
            battery: 85,
            flex: [0; 5],
        }
    }
}

impl MockPeripheralBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the peripheral identifier.
    #[must_use]
    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Set the advertised name.
    #[must_use]
    pub fn name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(String::from);
        self
    }

    /// Remove a characteristic, so streaming that kind fails.
    #[must_use]
    pub fn without(mut self, kind: ReadingKind) -> Self {
        self.characteristics.remove(&kind);
        self
    }

    /// Set the initial battery level.
    #[must_use]
    pub fn battery(mut self, level: u8) -> Self {
        self.battery = level;
        self
    }

    /// Set the initial flex values (thumb to pinky).
    #[must_use]
    pub fn flex(mut self, values: [u8; 5]) -> Self {
        self.flex = values;
        self
    }

    /// Build the mock peripheral.
    pub fn build(self) -> MockPeripheral {
        let values = HashMap::from([
            (ReadingKind::Battery, vec![self.battery]),
            (ReadingKind::FlexMulti, self.flex.to_vec()),
        ]);
        MockPeripheral {
            id: self.id,
            name: self.name,
            characteristics: self.characteristics,
            connected: AtomicBool::new(false),
            values: RwLock::new(values),
            subscribers: Mutex::new(HashMap::new()),
            should_fail: AtomicBool::new(false),
            connect_latency_ms: AtomicU64::new(0),
            connect_count: AtomicU32::new(0),
            disconnect_count: AtomicU32::new(0),
            stop_count: AtomicU32::new(0),
        }
    }
}

// ==========================================================================
// MockDiscovery
// ==========================================================================

/// A discovery primitive answering from a queue of scripted outcomes.
///
/// Once the queue is empty every request reports NotFound.
#[derive(Default)]
pub struct MockDiscovery {
    outcomes: Mutex<VecDeque<Result<Option<SharedPeripheral>>>>,
    request_count: AtomicU32,
}

impl std::fmt::Debug for MockDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDiscovery")
            .field("queued", &lock(&self.outcomes).len())
            .field("requests", &self.request_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockDiscovery {
    /// Create a discovery that finds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a discovery whose next request selects `peripheral`.
    pub fn selecting(peripheral: SharedPeripheral) -> Self {
        let discovery = Self::new();
        discovery.push_selection(peripheral);
        discovery
    }

    /// Queue a selection.
    pub fn push_selection(&self, peripheral: SharedPeripheral) {
        lock(&self.outcomes).push_back(Ok(Some(peripheral)));
    }

    /// Queue a user cancellation.
    pub fn push_not_found(&self) {
        lock(&self.outcomes).push_back(Ok(None));
    }

    /// Queue a failure of the discovery primitive itself.
    pub fn push_error(&self, error: Error) {
        lock(&self.outcomes).push_back(Err(error));
    }

    /// Number of discovery requests made.
    pub fn request_count(&self) -> u32 {
        self.request_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Discovery for MockDiscovery {
    async fn request_device(&self) -> Result<Option<SharedPeripheral>> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        lock(&self.outcomes).pop_front().unwrap_or(Ok(None))
    }
}

// ==========================================================================
// MockBackend
// ==========================================================================

/// An in-memory backend.
///
/// Device records are keyed by id and never modified once created, matching
/// the backend's upsert semantics.
#[derive(Default)]
pub struct MockBackend {
    devices: RwLock<Vec<DeviceRecord>>,
    readings: RwLock<Vec<Reading>>,
    should_fail: AtomicBool,
    fail_persistence: AtomicBool,
    /// Simulated latency of every call in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
    save_attempts: AtomicU32,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("should_fail", &self.should_fail.load(Ordering::Relaxed))
            .field(
                "fail_persistence",
                &self.fail_persistence.load(Ordering::Relaxed),
            )
            .field("save_attempts", &self.save_attempts.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockBackend {
    /// Maximum number of documents returned by a history fetch.
    pub const HISTORY_LIMIT: usize = 100;

    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Make only reading uploads fail.
    pub fn set_fail_persistence(&self, fail: bool) {
        self.fail_persistence.store(fail, Ordering::Relaxed);
    }

    /// Set simulated latency for every call.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of stored device records.
    pub async fn device_count(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Every reading stored so far, in upload order.
    pub async fn saved_readings(&self) -> Vec<Reading> {
        self.readings.read().await.clone()
    }

    /// Number of upload attempts, including failed ones.
    pub fn save_attempts(&self) -> u32 {
        self.save_attempts.load(Ordering::Relaxed)
    }

    async fn check_should_fail(&self) -> ApiResult<()> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.should_fail.load(Ordering::Relaxed) {
            Err(ApiError::Unavailable("Mock failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_devices(&self) -> ApiResult<Vec<DeviceRecord>> {
        self.check_should_fail().await?;
        Ok(self.devices.read().await.clone())
    }

    async fn upsert_device(&self, id: &str, name: &str) -> ApiResult<DeviceRecord> {
        self.check_should_fail().await?;

        let mut devices = self.devices.write().await;
        if let Some(existing) = devices.iter().find(|d| d.id == id) {
            return Ok(existing.clone());
        }
        let record = DeviceRecord::new(id, Some(name), OffsetDateTime::now_utc());
        devices.push(record.clone());
        Ok(record)
    }

    async fn save_reading(&self, reading: &Reading) -> ApiResult<()> {
        self.save_attempts.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail().await?;

        if self.fail_persistence.load(Ordering::Relaxed) {
            return Err(ApiError::Unavailable("Mock persistence failure".to_string()));
        }
        self.readings.write().await.push(reading.clone());
        Ok(())
    }

    async fn fetch_readings(&self, device_id: &str) -> ApiResult<Vec<Reading>> {
        self.check_should_fail().await?;

        let mut readings: Vec<Reading> = self
            .readings
            .read()
            .await
            .iter()
            .filter(|r| r.device_id == device_id)
            .cloned()
            .collect();
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        readings.truncate(Self::HISTORY_LIMIT);
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;
    use neuroglove_types::ReadingPayload;

    use super::*;

    #[tokio::test]
    async fn test_mock_peripheral_connect() {
        let glove = MockPeripheral::new("dev", Some("Glove"));
        assert!(!glove.is_connected().await);

        glove.connect().await.unwrap();
        assert!(glove.is_connected().await);
        assert_eq!(glove.connect_count(), 1);

        glove.disconnect().await.unwrap();
        assert!(!glove.is_connected().await);
    }

    #[tokio::test]
    async fn test_mock_peripheral_disconnect_twice_reports_error() {
        let glove = MockPeripheral::new("dev", None);
        glove.connect().await.unwrap();
        glove.disconnect().await.unwrap();
        assert!(matches!(glove.disconnect().await, Err(Error::NotConnected)));
        assert_eq!(glove.disconnect_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_peripheral_fail() {
        let glove = MockPeripheral::new("dev", None);
        glove.set_should_fail(true);
        let result = glove.connect().await;
        assert!(matches!(result, Err(Error::ConnectionFailed { .. })));
        assert!(!glove.is_connected().await);
    }

    #[tokio::test]
    async fn test_mock_peripheral_not_connected() {
        let glove = MockPeripheral::new("dev", None);
        let result = glove.read_value(ReadingKind::Battery).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_mock_peripheral_missing_characteristic() {
        let glove = MockPeripheral::builder()
            .without(ReadingKind::FlexMulti)
            .build();
        glove.connect().await.unwrap();

        let result = glove.notifications(ReadingKind::FlexMulti).await;
        assert!(matches!(result, Err(Error::CharacteristicNotFound { .. })));
        assert!(glove.notifications(ReadingKind::Battery).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_peripheral_notifications_in_order() {
        let glove = MockPeripheral::builder().battery(42).build();
        glove.connect().await.unwrap();
        assert_eq!(
            glove.read_value(ReadingKind::Battery).await.unwrap(),
            vec![42]
        );

        let mut stream = glove.notifications(ReadingKind::Battery).await.unwrap();
        assert!(glove.notify(ReadingKind::Battery, &[1]));
        assert!(glove.notify(ReadingKind::Battery, &[2]));
        glove.end_notifications(ReadingKind::Battery);

        assert_eq!(stream.next().await, Some(vec![1]));
        assert_eq!(stream.next().await, Some(vec![2]));
        assert_eq!(stream.next().await, None);
        assert!(!glove.notify(ReadingKind::Battery, &[3]));
    }

    #[tokio::test]
    async fn test_mock_discovery_queue() {
        let glove: SharedPeripheral = Arc::new(MockPeripheral::new("dev", None));
        let discovery = MockDiscovery::selecting(glove);
        discovery.push_not_found();

        assert!(discovery.request_device().await.unwrap().is_some());
        assert!(discovery.request_device().await.unwrap().is_none());
        assert!(discovery.request_device().await.unwrap().is_none());
        assert_eq!(discovery.request_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_backend_upsert_keeps_first_record() {
        let backend = MockBackend::new();
        let first = backend.upsert_device("dev", "Glove").await.unwrap();
        let second = backend.upsert_device("dev", "Renamed").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.name, "Glove");
        assert_eq!(backend.device_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_backend_history_limit() {
        let backend = MockBackend::new();
        for i in 0..120 {
            let reading = Reading::new(
                "dev",
                ReadingPayload::Battery { level: 50 },
                OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(i),
            );
            backend.save_reading(&reading).await.unwrap();
        }

        let history = backend.fetch_readings("dev").await.unwrap();
        assert_eq!(history.len(), MockBackend::HISTORY_LIMIT);
        assert_eq!(
            history[0].timestamp,
            OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(119)
        );
    }

    #[tokio::test]
    async fn test_mock_backend_persistence_failure() {
        let backend = MockBackend::new();
        backend.set_fail_persistence(true);
        let reading = Reading::new(
            "dev",
            ReadingPayload::Battery { level: 50 },
            OffsetDateTime::UNIX_EPOCH,
        );

        assert!(backend.save_reading(&reading).await.is_err());
        assert_eq!(backend.save_attempts(), 1);
        assert!(backend.saved_readings().await.is_empty());
        assert!(backend.list_devices().await.is_ok());
    }
}
