//! Platform-agnostic types for NeuroGlove flex-sensor gloves.
//!
//! This crate provides the data model shared by the session runtime
//! (neuroglove-core) and the command-line client.
//!
//! # Features
//!
//! - Reading kinds and their decoded payloads
//! - Device registry records
//! - UUID constants for BLE services and characteristics
//! - Error types for payload decoding
//!
//! # Example
//!
//! ```
//! use neuroglove_types::{FlexLevel, ReadingKind, ReadingPayload};
//!
//! let payload = ReadingPayload::decode(ReadingKind::FlexMulti, &[10, 45, 80, 0, 100]).unwrap();
//! let ReadingPayload::FlexMulti(values) = payload else { unreachable!() };
//! assert_eq!(FlexLevel::from_percent(values.middle), FlexLevel::High);
//! ```

pub mod error;
pub mod types;
pub mod uuid;

pub use crate::uuid as ble;
pub use error::{ParseError, ParseResult};
pub use types::{
    DEFAULT_DEVICE_NAME, DeviceRecord, Finger, FlexLevel, FlexValues, Reading, ReadingKind,
    ReadingPayload, display_name,
};

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use time::macros::datetime;

    // --- Battery decoding ---

    #[test]
    fn test_decode_battery_level() {
        let payload = ReadingPayload::decode(ReadingKind::Battery, &[87]).unwrap();
        assert_eq!(payload, ReadingPayload::Battery { level: 87 });
        assert_eq!(payload.kind(), ReadingKind::Battery);
    }

    #[test]
    fn test_decode_battery_extra_bytes_ignored() {
        let payload = ReadingPayload::decode(ReadingKind::Battery, &[42, 0xAA, 0xBB]).unwrap();
        assert_eq!(payload, ReadingPayload::Battery { level: 42 });
    }

    #[test]
    fn test_decode_battery_empty() {
        let err = ReadingPayload::decode(ReadingKind::Battery, &[]).unwrap_err();
        assert_eq!(
            err,
            ParseError::InsufficientBytes {
                kind: "battery",
                expected: 1,
                actual: 0,
            }
        );
    }

    #[test]
    fn test_decode_battery_out_of_range() {
        let err = ReadingPayload::decode(ReadingKind::Battery, &[101]).unwrap_err();
        assert!(err.to_string().contains("must be 0-100, got 101"));
    }

    // --- Flex decoding ---

    #[test]
    fn test_decode_flex_payload_order() {
        let values = FlexValues::from_bytes(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(values.thumb, 1);
        assert_eq!(values.index, 2);
        assert_eq!(values.middle, 3);
        assert_eq!(values.ring, 4);
        assert_eq!(values.pinky, 5);
        assert_eq!(values.to_bytes(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_decode_flex_insufficient_bytes() {
        let err = FlexValues::from_bytes(&[10, 20, 30, 40]).unwrap_err();
        assert!(err.to_string().contains("requires 5 bytes, got 4"));
    }

    #[test]
    fn test_decode_flex_rejects_values_over_100() {
        let err = FlexValues::from_bytes(&[10, 20, 130, 40, 50]).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidValue("Middle must be 0-100, got 130".to_string())
        );
    }

    #[test]
    fn test_decode_flex_extra_bytes_ignored() {
        let values = FlexValues::from_bytes(&[0, 100, 50, 25, 75, 0xFF]).unwrap();
        assert_eq!(values.get(Finger::Index), 100);
        assert_eq!(values.get(Finger::Pinky), 75);
    }

    #[test]
    fn test_flex_iter_in_finger_order() {
        let values = FlexValues::from_array([9, 8, 7, 6, 5]);
        let fingers: Vec<_> = values.iter().collect();
        assert_eq!(
            fingers,
            vec![
                (Finger::Thumb, 9),
                (Finger::Index, 8),
                (Finger::Middle, 7),
                (Finger::Ring, 6),
                (Finger::Pinky, 5),
            ]
        );
    }

    // --- FlexLevel ---

    #[test]
    fn test_flex_level_thresholds() {
        assert_eq!(FlexLevel::from_percent(0), FlexLevel::Low);
        assert_eq!(FlexLevel::from_percent(29), FlexLevel::Low);
        assert_eq!(FlexLevel::from_percent(30), FlexLevel::Moderate);
        assert_eq!(FlexLevel::from_percent(69), FlexLevel::Moderate);
        assert_eq!(FlexLevel::from_percent(70), FlexLevel::High);
        assert_eq!(FlexLevel::from_percent(100), FlexLevel::High);
        assert!(FlexLevel::Low < FlexLevel::High);
    }

    // --- ReadingKind ---

    #[test]
    fn test_reading_kind_capacities() {
        assert_eq!(ReadingKind::Battery.buffer_capacity(), 20);
        assert_eq!(ReadingKind::FlexMulti.buffer_capacity(), 50);
    }

    #[test]
    fn test_reading_kind_from_str() {
        assert_eq!("battery".parse::<ReadingKind>(), Ok(ReadingKind::Battery));
        assert_eq!("FLEX".parse::<ReadingKind>(), Ok(ReadingKind::FlexMulti));
        assert_eq!(
            "flex-multi".parse::<ReadingKind>(),
            Ok(ReadingKind::FlexMulti)
        );
        assert!(matches!(
            "temperature".parse::<ReadingKind>(),
            Err(ParseError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_reading_kind_characteristics() {
        assert_eq!(ReadingKind::Battery.service(), ble::BATTERY_SERVICE);
        assert_eq!(ReadingKind::FlexMulti.service(), ble::FLEX_SERVICE);
        assert_eq!(ReadingKind::FlexMulti.to_string(), "flex-multi");
    }

    // --- DeviceRecord ---

    #[test]
    fn test_device_record_default_name() {
        let record = DeviceRecord::new("AA:BB", None, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(record.name, DEFAULT_DEVICE_NAME);

        let record = DeviceRecord::new("AA:BB", Some(""), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(record.name, "Unknown Device");

        let record = DeviceRecord::new("AA:BB", Some(" Glove L "), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(record.name, "Glove L");
    }

    // --- Serialization ---

    #[test]
    fn test_battery_reading_serialization() {
        let reading = Reading::new(
            "dev-1",
            ReadingPayload::Battery { level: 64 },
            datetime!(2024-05-01 12:00:00 UTC),
        );

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["type"], "battery");
        assert_eq!(json["battery_level"], 64);
        assert_eq!(json["device_id"], "dev-1");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_flex_payload_serialization() {
        let payload = ReadingPayload::FlexMulti(FlexValues::from_array([1, 2, 3, 4, 5]));
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"type\":\"flex-multi\""));
        assert!(json.contains("\"thumb\":1"));
        assert!(json.contains("\"pinky\":5"));
    }

    #[test]
    fn test_reading_deserialization() {
        let json = r#"{"device_id":"dev-2","type":"flex-multi","thumb":10,"index":20,"middle":30,"ring":40,"pinky":50,"timestamp":"2024-05-01T12:00:01Z"}"#;

        let reading: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.kind(), ReadingKind::FlexMulti);
        assert_eq!(reading.flex().map(|f| f.ring), Some(40));
        assert_eq!(reading.battery_level(), None);
        assert_eq!(reading.timestamp, datetime!(2024-05-01 12:00:01 UTC));
    }

    #[test]
    fn test_device_record_serialization() {
        let record = DeviceRecord::new("dev-3", Some("Glove"), datetime!(2024-01-02 03:04:05 UTC));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["connected_at"], "2024-01-02T03:04:05Z");

        let back: DeviceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Decoding arbitrary bytes never panics.
        #[test]
        fn decode_never_panics(data: Vec<u8>) {
            let _ = ReadingPayload::decode(ReadingKind::Battery, &data);
            let _ = ReadingPayload::decode(ReadingKind::FlexMulti, &data);
        }

        /// Any in-range finger values survive a decode.
        #[test]
        fn flex_in_range_is_accepted(values in proptest::array::uniform5(0u8..=100)) {
            let decoded = FlexValues::from_bytes(&values).unwrap();
            prop_assert_eq!(decoded.to_bytes(), values);
        }

        /// A single finger over 100 rejects the whole payload.
        #[test]
        fn flex_out_of_range_is_rejected(
            mut values in proptest::array::uniform5(0u8..=100),
            finger in 0usize..5,
            bad in 101u8..=255,
        ) {
            values[finger] = bad;
            prop_assert!(FlexValues::from_bytes(&values).is_err());
        }

        /// Level buckets are monotonic in the bend percentage.
        #[test]
        fn flex_level_is_monotonic(a in 0u8..=100, b in 0u8..=100) {
            if a <= b {
                prop_assert!(FlexLevel::from_percent(a) <= FlexLevel::from_percent(b));
            }
        }
    }
}
