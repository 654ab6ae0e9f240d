//! Core library for NeuroGlove flex-sensor gloves.
//!
//! This crate connects to a NeuroGlove over Bluetooth Low Energy, streams its
//! sensor values into a bounded in-memory buffer, and mirrors devices and
//! readings to the NeuroGlove HTTP backend.
//!
//! # Features
//!
//! - **Session state machine**: discovery, registration, connection and
//!   teardown of one peripheral at a time
//! - **Sensor streaming**: battery or five-finger flex values from
//!   characteristic notifications
//! - **Simulation**: synthetic values on a fixed interval when the peripheral
//!   lacks the sensor characteristic, or on request
//! - **Backend client**: device registry, fire-and-forget persistence and
//!   history retrieval
//! - **Mocks**: peripheral, discovery and backend doubles for hardware-free use
//!
//! # Streaming Modes
//!
//! | Mode | Characteristic | Payload | Buffer |
//! |------|----------------|---------|--------|
//! | `battery` | Battery Level (0x2A19) | 1 byte, 0-100 | 20 |
//! | `flex-multi` | NeuroGlove flex sensors | 5 bytes, thumb to pinky, 0-100 | 50 |
//!
//! # Quick Start
//!
//! ```no_run
//! use neuroglove_core::{ClientConfig, DiscoveryOutcome, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = SessionController::from_config(&ClientConfig::default())?;
//!     let mut events = session.subscribe_events();
//!
//!     if let DiscoveryOutcome::Selected(device) = session.discover_and_connect().await? {
//!         println!("Connected to {} ({})", device.name, device.id);
//!         while let Ok(event) = events.recv().await {
//!             println!("{:?}", event);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod ble;
pub mod buffer;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod ingest;
pub mod mock;
pub mod peripheral;
pub mod registry;
pub mod session;
pub mod subscription;

mod wire;

pub use neuroglove_types::types;
pub use neuroglove_types::uuid;

// Core exports
pub use api::{ApiError, ApiResult, Backend, HttpBackend, SharedBackend};
pub use ble::{BleDiscovery, BlePeripheral};
pub use buffer::{ReadingBuffer, SharedBuffer};
pub use config::{ApiConfig, ClientConfig, DEFAULT_BASE_URL, SessionConfig, SimulationMode};
pub use error::{ConnectionFailureReason, Error, Result};
pub use events::{DisconnectReason, EventDispatcher, EventReceiver, EventSender, SessionEvent};
pub use history::HistoryClient;
pub use ingest::Ingest;
pub use mock::{MockBackend, MockDiscovery, MockPeripheral, MockPeripheralBuilder};
pub use peripheral::{Discovery, GlovePeripheral, NotificationStream, SharedPeripheral};
pub use registry::DeviceRegistry;
pub use session::{DiscoveryOutcome, SessionController, SessionState};
pub use subscription::{StreamSource, SubscriptionHandle, simulate, subscribe};

// Re-export the domain types most callers need
pub use neuroglove_types::{
    DeviceRecord, Finger, FlexLevel, FlexValues, Reading, ReadingKind, ReadingPayload,
};
