//! Core types for NeuroGlove sensor data.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ParseError, ParseResult};

/// Display name used when a peripheral does not advertise one.
pub const DEFAULT_DEVICE_NAME: &str = "Unknown Device";

/// Number of bytes in a battery level notification.
pub const BATTERY_PAYLOAD_BYTES: usize = 1;

/// Number of bytes in a multi-finger flex notification (one per finger).
pub const FLEX_PAYLOAD_BYTES: usize = 5;

/// Ring-buffer capacity when streaming battery readings.
pub const BATTERY_BUFFER_CAPACITY: usize = 20;

/// Ring-buffer capacity when streaming flex readings.
pub const FLEX_BUFFER_CAPACITY: usize = 50;

/// A known peripheral, as stored by the backend device registry.
///
/// Records are created on the first successful discovery and never change
/// afterwards; clients only hold cached copies.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceRecord {
    /// Peripheral-assigned identifier (opaque).
    pub id: String,
    /// Display name.
    pub name: String,
    /// When the device was first paired.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub connected_at: OffsetDateTime,
}

impl DeviceRecord {
    /// Create a record, substituting [`DEFAULT_DEVICE_NAME`] for a missing
    /// or blank name.
    pub fn new(id: impl Into<String>, name: Option<&str>, connected_at: OffsetDateTime) -> Self {
        Self {
            id: id.into(),
            name: display_name(name).to_string(),
            connected_at,
        }
    }
}

/// Resolve the display name for a peripheral.
///
/// ```
/// use neuroglove_types::{display_name, DEFAULT_DEVICE_NAME};
///
/// assert_eq!(display_name(Some("Glove")), "Glove");
/// assert_eq!(display_name(Some("  ")), DEFAULT_DEVICE_NAME);
/// assert_eq!(display_name(None), DEFAULT_DEVICE_NAME);
/// ```
#[must_use]
pub fn display_name(name: Option<&str>) -> &str {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n,
        _ => DEFAULT_DEVICE_NAME,
    }
}

/// The sensor stream a reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReadingKind {
    /// Battery percentage from the standard Battery Service.
    #[cfg_attr(feature = "serde", serde(rename = "battery"))]
    Battery,
    /// Bend percentage of all five fingers.
    #[cfg_attr(feature = "serde", serde(rename = "flex-multi"))]
    FlexMulti,
}

impl ReadingKind {
    /// Wire name of the kind, as used in the `type` field of payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingKind::Battery => "battery",
            ReadingKind::FlexMulti => "flex-multi",
        }
    }

    /// How many of the most recent readings a session keeps in memory.
    pub fn buffer_capacity(&self) -> usize {
        match self {
            ReadingKind::Battery => BATTERY_BUFFER_CAPACITY,
            ReadingKind::FlexMulti => FLEX_BUFFER_CAPACITY,
        }
    }

    /// Minimum notification length for this kind.
    pub fn payload_bytes(&self) -> usize {
        match self {
            ReadingKind::Battery => BATTERY_PAYLOAD_BYTES,
            ReadingKind::FlexMulti => FLEX_PAYLOAD_BYTES,
        }
    }

    /// GATT service carrying this kind's characteristic.
    pub fn service(&self) -> uuid::Uuid {
        match self {
            ReadingKind::Battery => crate::uuid::BATTERY_SERVICE,
            ReadingKind::FlexMulti => crate::uuid::FLEX_SERVICE,
        }
    }

    /// GATT characteristic that notifies this kind.
    ///
    /// ```
    /// use neuroglove_types::{ReadingKind, ble};
    ///
    /// assert_eq!(ReadingKind::Battery.characteristic(), ble::BATTERY_LEVEL);
    /// assert_eq!(ReadingKind::FlexMulti.characteristic(), ble::FLEX_SENSORS);
    /// ```
    pub fn characteristic(&self) -> uuid::Uuid {
        match self {
            ReadingKind::Battery => crate::uuid::BATTERY_LEVEL,
            ReadingKind::FlexMulti => crate::uuid::FLEX_SENSORS,
        }
    }
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingKind {
    type Err = ParseError;

    /// Parse a kind name. Accepts `battery`, `flex`, `flex-multi` and
    /// `flex_multi` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "battery" => Ok(ReadingKind::Battery),
            "flex" | "flex-multi" | "flex_multi" => Ok(ReadingKind::FlexMulti),
            other => Err(ParseError::UnknownKind(other.to_string())),
        }
    }
}

/// A finger of the glove, in flex payload order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// All fingers in payload order.
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Finger::Thumb => "Thumb",
            Finger::Index => "Index",
            Finger::Middle => "Middle",
            Finger::Ring => "Ring",
            Finger::Pinky => "Pinky",
        };
        f.write_str(name)
    }
}

/// How far a finger is bent, bucketed for display.
///
/// # Ordering
///
/// Levels are ordered by bend: `Low < Moderate < High`.
///
/// ```
/// use neuroglove_types::FlexLevel;
///
/// assert_eq!(FlexLevel::from_percent(29), FlexLevel::Low);
/// assert_eq!(FlexLevel::from_percent(30), FlexLevel::Moderate);
/// assert_eq!(FlexLevel::from_percent(70), FlexLevel::High);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FlexLevel {
    /// Below 30%.
    Low,
    /// 30% up to (but excluding) 70%.
    Moderate,
    /// 70% and above.
    High,
}

impl FlexLevel {
    /// Upper bound (exclusive) of [`FlexLevel::Low`].
    pub const MODERATE_FROM: u8 = 30;
    /// Upper bound (exclusive) of [`FlexLevel::Moderate`].
    pub const HIGH_FROM: u8 = 70;

    /// Bucket a bend percentage.
    #[must_use]
    pub fn from_percent(value: u8) -> Self {
        if value < Self::MODERATE_FROM {
            FlexLevel::Low
        } else if value < Self::HIGH_FROM {
            FlexLevel::Moderate
        } else {
            FlexLevel::High
        }
    }
}

impl fmt::Display for FlexLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlexLevel::Low => write!(f, "Low"),
            FlexLevel::Moderate => write!(f, "Moderate"),
            FlexLevel::High => write!(f, "High"),
        }
    }
}

/// Bend percentage (0-100) of each finger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlexValues {
    pub thumb: u8,
    pub index: u8,
    pub middle: u8,
    pub ring: u8,
    pub pinky: u8,
}

impl FlexValues {
    /// Build flex values from an array in payload order.
    pub fn from_array(values: [u8; FLEX_PAYLOAD_BYTES]) -> Self {
        let [thumb, index, middle, ring, pinky] = values;
        Self {
            thumb,
            index,
            middle,
            ring,
            pinky,
        }
    }

    /// Decode a flex notification.
    ///
    /// The byte format is one unsigned byte per finger, each a bend
    /// percentage in `0..=100`:
    /// - byte 0: thumb
    /// - byte 1: index
    /// - byte 2: middle
    /// - byte 3: ring
    /// - byte 4: pinky
    ///
    /// Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InsufficientBytes`] for fewer than
    /// [`FLEX_PAYLOAD_BYTES`] bytes and [`ParseError::InvalidValue`] if any
    /// finger reports more than 100.
    #[must_use = "parsing returns a Result that should be handled"]
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        use bytes::Buf;

        if data.len() < FLEX_PAYLOAD_BYTES {
            return Err(ParseError::InsufficientBytes {
                kind: ReadingKind::FlexMulti.as_str(),
                expected: FLEX_PAYLOAD_BYTES,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let mut values = [0u8; FLEX_PAYLOAD_BYTES];
        for (finger, slot) in Finger::ALL.iter().zip(values.iter_mut()) {
            let value = buf.get_u8();
            if value > 100 {
                return Err(ParseError::out_of_range(&finger.to_string(), value));
            }
            *slot = value;
        }

        Ok(Self::from_array(values))
    }

    /// Encode in notification byte order.
    pub fn to_bytes(&self) -> [u8; FLEX_PAYLOAD_BYTES] {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
    }

    /// Bend percentage of one finger.
    pub fn get(&self, finger: Finger) -> u8 {
        match finger {
            Finger::Thumb => self.thumb,
            Finger::Index => self.index,
            Finger::Middle => self.middle,
            Finger::Ring => self.ring,
            Finger::Pinky => self.pinky,
        }
    }

    /// Iterate over `(finger, percent)` pairs in payload order.
    pub fn iter(&self) -> impl Iterator<Item = (Finger, u8)> + '_ {
        Finger::ALL.iter().map(move |&finger| (finger, self.get(finger)))
    }
}

/// Kind-specific fields of a reading.
///
/// Serialized with an internal `type` tag, matching the backend's
/// sensor-data documents:
///
/// ```json
/// {"type": "battery", "battery_level": 87}
/// {"type": "flex-multi", "thumb": 12, "index": 40, "middle": 71, "ring": 5, "pinky": 99}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum ReadingPayload {
    /// Battery percentage.
    #[cfg_attr(feature = "serde", serde(rename = "battery"))]
    Battery {
        #[cfg_attr(feature = "serde", serde(rename = "battery_level"))]
        level: u8,
    },
    /// Per-finger bend.
    #[cfg_attr(feature = "serde", serde(rename = "flex-multi"))]
    FlexMulti(FlexValues),
}

impl ReadingPayload {
    /// The kind discriminant of this payload.
    pub fn kind(&self) -> ReadingKind {
        match self {
            ReadingPayload::Battery { .. } => ReadingKind::Battery,
            ReadingPayload::FlexMulti(_) => ReadingKind::FlexMulti,
        }
    }

    /// Decode a raw characteristic value of the given kind.
    ///
    /// A battery notification is a single unsigned byte holding the level
    /// percentage (`0..=100`); see [`FlexValues::from_bytes`] for flex.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the buffer is too short or a value is
    /// out of range.
    #[must_use = "parsing returns a Result that should be handled"]
    pub fn decode(kind: ReadingKind, data: &[u8]) -> ParseResult<Self> {
        match kind {
            ReadingKind::Battery => {
                let Some(&level) = data.first() else {
                    return Err(ParseError::InsufficientBytes {
                        kind: kind.as_str(),
                        expected: BATTERY_PAYLOAD_BYTES,
                        actual: 0,
                    });
                };
                if level > 100 {
                    return Err(ParseError::out_of_range("battery level", level));
                }
                Ok(ReadingPayload::Battery { level })
            }
            ReadingKind::FlexMulti => FlexValues::from_bytes(data).map(ReadingPayload::FlexMulti),
        }
    }

    /// Encode back into the characteristic byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ReadingPayload::Battery { level } => vec![*level],
            ReadingPayload::FlexMulti(values) => values.to_bytes().to_vec(),
        }
    }
}

/// One decoded, timestamped sensor sample.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Identifier of the peripheral that produced the sample.
    pub device_id: String,
    /// Kind-specific fields.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub payload: ReadingPayload,
    /// When the sample was ingested.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl Reading {
    /// Create a reading.
    pub fn new(
        device_id: impl Into<String>,
        payload: ReadingPayload,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            payload,
            timestamp,
        }
    }

    /// Decode a raw notification into a reading.
    ///
    /// # Errors
    ///
    /// See [`ReadingPayload::decode`].
    pub fn decode(
        device_id: impl Into<String>,
        kind: ReadingKind,
        data: &[u8],
        timestamp: OffsetDateTime,
    ) -> ParseResult<Self> {
        let payload = ReadingPayload::decode(kind, data)?;
        Ok(Self::new(device_id, payload, timestamp))
    }

    /// The kind discriminant of this reading.
    pub fn kind(&self) -> ReadingKind {
        self.payload.kind()
    }

    /// Battery level, if this is a battery reading.
    pub fn battery_level(&self) -> Option<u8> {
        match self.payload {
            ReadingPayload::Battery { level } => Some(level),
            ReadingPayload::FlexMulti(_) => None,
        }
    }

    /// Flex values, if this is a flex reading.
    pub fn flex(&self) -> Option<&FlexValues> {
        match &self.payload {
            ReadingPayload::FlexMulti(values) => Some(values),
            ReadingPayload::Battery { .. } => None,
        }
    }
}
