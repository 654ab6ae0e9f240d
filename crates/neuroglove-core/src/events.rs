//! Session event system.
//!
//! A [`crate::SessionController`] publishes lifecycle transitions and every
//! ingested reading on a broadcast channel. Events are serializable so they
//! can be logged or forwarded as JSON lines.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use neuroglove_types::{DeviceRecord, Reading};

use crate::subscription::StreamSource;

/// Events emitted by a session.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// Discovery was started.
    DiscoveryStarted,
    /// The user picked no device, or none was in range.
    DiscoveryCancelled,
    /// A peripheral was selected and registered.
    DeviceSelected { device: DeviceRecord },
    /// Transport connect started.
    Connecting { device_id: String },
    /// The session is streaming.
    Connected {
        device: DeviceRecord,
        source: StreamSource,
    },
    /// Connect failed; the session is Idle again.
    ConnectionFailed { device_id: String, error: String },
    /// A reading was ingested.
    Reading { reading: Reading },
    /// A reading could not be persisted. It remains in the local buffer.
    PersistFailed { device_id: String, error: String },
    /// The session returned to Idle.
    Disconnected {
        device_id: String,
        reason: DisconnectReason,
    },
}

/// Reason for disconnection.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DisconnectReason {
    /// Normal disconnection requested by user.
    UserRequested,
    /// The session was torn down by dropping its controller.
    Dropped,
    /// BLE error occurred.
    BleError(String),
}

/// Sender for session events.
pub type EventSender = broadcast::Sender<SessionEvent>;

/// Receiver for session events.
pub type EventReceiver = broadcast::Receiver<SessionEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: SessionEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(256)
    }
}
