//! Trait abstractions over the platform Bluetooth stack.
//!
//! [`GlovePeripheral`] covers the handful of GATT operations a session needs;
//! [`Discovery`] covers the user-facing "pick a device" primitive. The
//! btleplug implementations live in [`crate::ble`], test doubles in
//! [`crate::mock`].

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use neuroglove_types::ReadingKind;

use crate::error::Result;

/// Raw characteristic values, in arrival order.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// A NeuroGlove peripheral.
///
/// # Example
///
/// ```ignore
/// use neuroglove_core::{GlovePeripheral, Result};
/// use neuroglove_types::ReadingKind;
///
/// async fn battery<P: GlovePeripheral + ?Sized>(peripheral: &P) -> Result<Vec<u8>> {
///     peripheral.connect().await?;
///     peripheral.read_value(ReadingKind::Battery).await
/// }
/// ```
#[async_trait]
pub trait GlovePeripheral: Send + Sync {
    /// Platform identifier of the peripheral.
    fn id(&self) -> &str;

    /// Advertised name, if any.
    fn name(&self) -> Option<&str>;

    /// Open the transport connection and discover services.
    async fn connect(&self) -> Result<()>;

    /// Close the transport connection. Closing an already-closed connection
    /// may report an error; callers tear down regardless.
    async fn disconnect(&self) -> Result<()>;

    /// Check if the transport reports a live connection.
    async fn is_connected(&self) -> bool;

    /// Read the current value of the characteristic carrying `kind`.
    async fn read_value(&self, kind: ReadingKind) -> Result<Vec<u8>>;

    /// Enable notifications for `kind` and return the value stream.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CharacteristicNotFound`] when the peripheral
    /// does not expose the characteristic.
    async fn notifications(&self, kind: ReadingKind) -> Result<NotificationStream>;

    /// Disable notifications for `kind`.
    async fn stop_notifications(&self, kind: ReadingKind) -> Result<()>;
}

/// A peripheral handle shared between a session and its stream task.
pub type SharedPeripheral = Arc<dyn GlovePeripheral>;

/// Platform device discovery.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Ask for a peripheral.
    ///
    /// Returns `Ok(None)` when the user cancelled or nothing matched; that is
    /// not an error.
    async fn request_device(&self) -> Result<Option<SharedPeripheral>>;
}
