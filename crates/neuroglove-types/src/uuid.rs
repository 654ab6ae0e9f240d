//! Bluetooth UUIDs for NeuroGlove peripherals.
//!
//! The battery level uses the standard Battery Service. Flex data is
//! published on a vendor service with one notify characteristic.

use uuid::{Uuid, uuid};

// --- NeuroGlove Service UUIDs ---

/// NeuroGlove flex-sensor service.
pub const FLEX_SERVICE: Uuid = uuid!("6e67f100-3b4c-4d2a-9f1e-4e6575726f47");

/// Multi-finger flex characteristic (read + notify).
///
/// See [`crate::FlexValues::from_bytes`] for the payload layout.
pub const FLEX_SENSORS: Uuid = uuid!("6e67f101-3b4c-4d2a-9f1e-4e6575726f47");

// --- Standard BLE Service UUIDs ---

/// Generic Access Profile (GAP) service.
pub const GAP_SERVICE: Uuid = uuid!("00001800-0000-1000-8000-00805f9b34fb");

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

/// Battery service.
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

// --- Standard BLE Characteristic UUIDs ---

/// Device name characteristic.
pub const DEVICE_NAME: Uuid = uuid!("00002a00-0000-1000-8000-00805f9b34fb");

/// Battery level characteristic.
pub const BATTERY_LEVEL: Uuid = uuid!("00002a19-0000-1000-8000-00805f9b34fb");
