//! Error types for data parsing in neuroglove-types.

use thiserror::Error;

/// Errors that can occur when decoding NeuroGlove sensor data.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific or network errors (those belong in neuroglove-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The notification buffer is shorter than the payload layout requires.
    #[error("Insufficient bytes: {kind} payload requires {expected} bytes, got {actual}")]
    InsufficientBytes {
        /// Payload kind being decoded.
        kind: &'static str,
        /// Minimum number of bytes required.
        expected: usize,
        /// Number of bytes received.
        actual: usize,
    },

    /// A decoded field is outside its valid range.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The payload names a reading kind this crate does not know.
    #[error("Unknown reading kind: {0}")]
    UnknownKind(String),
}

impl ParseError {
    /// Create an out-of-range error for a percentage field.
    pub fn out_of_range(field: &str, value: u8) -> Self {
        Self::InvalidValue(format!("{field} must be 0-100, got {value}"))
    }
}

/// Result type alias using neuroglove-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
