//! Output formatting for text and JSON output.

use anyhow::Result;
use neuroglove_types::{DeviceRecord, FlexLevel, FlexValues, Reading, ReadingPayload};
use owo_colors::OwoColorize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    /// Serialize a value as pretty JSON followed by a newline.
    pub fn as_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)? + "\n")
    }
}

fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| "Unknown".to_string())
}

/// Format one bend percentage, colored by [`FlexLevel`].
#[must_use]
pub fn format_flex_value(value: u8, no_color: bool) -> String {
    let text = format!("{:>3}%", value);
    if no_color {
        return text;
    }
    match FlexLevel::from_percent(value) {
        FlexLevel::Low => text.green().to_string(),
        FlexLevel::Moderate => text.yellow().to_string(),
        FlexLevel::High => text.red().to_string(),
    }
}

fn format_flex(flex: &FlexValues, opts: &FormatOptions) -> String {
    flex.iter()
        .map(|(finger, value)| format!("{} {}", finger, format_flex_value(value, opts.no_color)))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Format a battery level with a low-battery highlight.
#[must_use]
pub fn format_battery(level: u8, no_color: bool) -> String {
    let text = format!("BAT {}%", level);
    if no_color || level > 20 {
        text
    } else {
        text.red().to_string()
    }
}

/// One line per reading, as printed while streaming.
#[must_use]
pub fn format_reading_line(reading: &Reading, opts: &FormatOptions) -> String {
    let value = match &reading.payload {
        ReadingPayload::Battery { level } => format_battery(*level, opts.no_color),
        ReadingPayload::FlexMulti(flex) => format_flex(flex, opts),
    };
    format!("{}  {}\n", format_timestamp(reading.timestamp), value)
}

/// One compact JSON object per reading, as printed while streaming.
pub fn format_reading_json_line(reading: &Reading) -> Result<String> {
    Ok(serde_json::to_string(reading)? + "\n")
}

#[must_use]
pub fn format_history_text(readings: &[Reading], opts: &FormatOptions) -> String {
    if readings.is_empty() {
        return "No readings found.\n".to_string();
    }

    let mut output = format!("History ({} readings, newest first):\n\n", readings.len());
    for reading in readings {
        output.push_str(&format_reading_line(reading, opts));
    }
    output
}

pub fn format_history_json(readings: &[Reading], opts: &FormatOptions) -> Result<String> {
    opts.as_json(readings)
}

#[must_use]
pub fn format_device_text(device: &DeviceRecord, opts: &FormatOptions) -> String {
    let name = if opts.no_color {
        device.name.clone()
    } else {
        device.name.green().to_string()
    };
    let id = if opts.no_color {
        device.id.clone()
    } else {
        device.id.cyan().to_string()
    };
    format!(
        "{} ({})  registered {}\n",
        name,
        id,
        format_timestamp(device.connected_at)
    )
}

#[must_use]
pub fn format_devices_text(devices: &[DeviceRecord], opts: &FormatOptions) -> String {
    if devices.is_empty() {
        return "No devices registered.\nRun 'neuroglove connect' to pair a glove.\n".to_string();
    }

    let mut output = format!("Registered devices ({}):\n\n", devices.len());
    for device in devices {
        output.push_str("  ");
        output.push_str(&format_device_text(device, opts));
    }
    output
}

pub fn format_devices_json(devices: &[DeviceRecord], opts: &FormatOptions) -> Result<String> {
    opts.as_json(devices)
}
