//! JSON documents exchanged with the backend.
//!
//! Sensor-data documents carry a reading payload in their `data` field.
//! Payloads are tagged by `type`, but older flex documents were stored
//! without a tag, so the decoder falls back to inferring the kind from the
//! fields present. Anything that cannot be decoded is rejected here and never
//! handed to callers untyped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

use neuroglove_types::{DeviceRecord, Finger, Reading, ReadingKind, ReadingPayload};

/// `GET /api/devices` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct DeviceList {
    #[serde(default)]
    pub devices: Vec<DeviceDoc>,
}

/// `POST /api/devices` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct RegisteredDevice {
    pub device: DeviceDoc,
}

/// A device document as stored by the backend.
#[derive(Debug, Deserialize)]
pub(crate) struct DeviceDoc {
    pub device_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub connected_at: Option<String>,
}

impl DeviceDoc {
    pub fn into_record(self) -> DeviceRecord {
        let connected_at = self
            .connected_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(OffsetDateTime::now_utc);
        DeviceRecord::new(self.device_id, self.device_name.as_deref(), connected_at)
    }
}

/// `POST /api/devices` request body.
#[derive(Debug, Serialize)]
pub(crate) struct RegisterDevice<'a> {
    pub device_id: &'a str,
    pub device_name: &'a str,
}

/// `POST /api/sensor-data` request body.
#[derive(Debug, Serialize)]
pub(crate) struct SensorDataUpload<'a> {
    pub device_id: &'a str,
    pub data: ReadingData<'a>,
}

/// A reading payload with its timestamp, as stored in `data`.
#[derive(Debug, Serialize)]
pub(crate) struct ReadingData<'a> {
    #[serde(flatten)]
    pub payload: &'a ReadingPayload,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl<'a> SensorDataUpload<'a> {
    pub fn new(reading: &'a Reading) -> Self {
        Self {
            device_id: &reading.device_id,
            data: ReadingData {
                payload: &reading.payload,
                timestamp: reading.timestamp,
            },
        }
    }
}

/// `GET /api/sensor-data/{device_id}` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct SensorDataList {
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Parse an RFC 3339 timestamp, or an ISO 8601 one without offset (taken as UTC).
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(s, &Iso8601::DEFAULT))
        .ok()
        .or_else(|| {
            PrimitiveDateTime::parse(s, &Iso8601::DEFAULT)
                .ok()
                .map(PrimitiveDateTime::assume_utc)
        })
}

fn field_name(finger: Finger) -> &'static str {
    match finger {
        Finger::Thumb => "thumb",
        Finger::Index => "index",
        Finger::Middle => "middle",
        Finger::Ring => "ring",
        Finger::Pinky => "pinky",
    }
}

fn percent_field(obj: &Value, name: &str) -> Result<u8, String> {
    let value = obj
        .get(name)
        .ok_or_else(|| format!("missing field '{name}'"))?;
    let number = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v.round() as u64)
        })
        .ok_or_else(|| format!("field '{name}' is not a non-negative number"))?;
    u8::try_from(number).map_err(|_| format!("field '{name}' out of range: {number}"))
}

fn infer_kind(payload: &Value) -> Result<ReadingKind, String> {
    if let Some(tag) = payload.get("type") {
        let tag = tag.as_str().ok_or("'type' is not a string")?;
        return tag.parse::<ReadingKind>().map_err(|e| e.to_string());
    }
    if payload.get("battery_level").is_some() {
        return Ok(ReadingKind::Battery);
    }
    if Finger::ALL
        .iter()
        .all(|&finger| payload.get(field_name(finger)).is_some())
    {
        return Ok(ReadingKind::FlexMulti);
    }
    Err("cannot infer reading kind".to_string())
}

/// Decode one sensor-data document into a [`Reading`].
///
/// The payload is read from the document's `data` object (or the document
/// itself when it has none), re-encoded into the characteristic byte layout
/// and run through the same decoder as live notifications. The payload's
/// own `timestamp` wins over the document's.
pub fn decode_history_doc(device_id: &str, doc: &Value) -> Result<Reading, String> {
    let payload = match doc.get("data") {
        Some(data) if data.is_object() => data,
        _ => doc,
    };

    let kind = infer_kind(payload)?;
    let bytes = match kind {
        ReadingKind::Battery => vec![percent_field(payload, "battery_level")?],
        ReadingKind::FlexMulti => Finger::ALL
            .iter()
            .map(|&finger| percent_field(payload, field_name(finger)))
            .collect::<Result<Vec<_>, _>>()?,
    };
    let decoded = ReadingPayload::decode(kind, &bytes).map_err(|e| e.to_string())?;

    let timestamp = [payload.get("timestamp"), doc.get("timestamp")]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find_map(parse_timestamp)
        .ok_or("missing or invalid timestamp")?;

    let device_id = doc
        .get("device_id")
        .and_then(Value::as_str)
        .unwrap_or(device_id);

    Ok(Reading::new(device_id, decoded, timestamp))
}
