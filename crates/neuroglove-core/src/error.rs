//! Error types for neuroglove-core.
//!
//! Every failure in this crate resolves back to a well-defined session state
//! (usually Idle) or to a no-op; none of them is fatal to the process.
//!
//! | Error | Raised by | Session effect |
//! |-------|-----------|----------------|
//! | [`Error::ConnectionFailed`] | connect, stream arming | returns to Idle |
//! | [`Error::InvalidState`] | any transition from the wrong state | none |
//! | [`Error::Network`] | registry, history, persistence | none (persistence is logged only) |
//! | [`Error::Validation`] | device registration | none |
//! | [`Error::CharacteristicNotFound`] | stream arming | simulation fallback under `auto` |
//!
//! A user cancelling discovery is not an error; it is reported as
//! [`crate::DiscoveryOutcome::NotFound`].

use std::time::Duration;

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur in a NeuroGlove session.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Transport-level connection failed.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// The device identifier that failed to connect.
        device_id: Option<String>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// Operation attempted in the wrong session state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The state the session was in.
        state: crate::session::SessionState,
    },

    /// A backend call failed.
    #[error("Network error: {0}")]
    Network(#[from] ApiError),

    /// Caller-supplied input was rejected.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation attempted while not connected to device.
    #[error("Not connected to device")]
    NotConnected,

    /// Required BLE characteristic not found on device.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// A notification did not match the payload layout.
    #[error("Invalid data: {0}")]
    InvalidData(#[from] neuroglove_types::ParseError),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons for connection failures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// Bluetooth adapter not available or powered off.
    AdapterUnavailable,
    /// Connection attempt timed out.
    Timeout,
    /// The peripheral connected but its sensor stream could not be armed.
    StreamUnavailable(String),
    /// Generic BLE error.
    BleError(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdapterUnavailable => write!(f, "Bluetooth adapter unavailable"),
            Self::Timeout => write!(f, "connection timed out"),
            Self::StreamUnavailable(msg) => write!(f, "sensor stream unavailable: {}", msg),
            Self::BleError(msg) => write!(f, "BLE error: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error {
    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(operation: &'static str, state: crate::session::SessionState) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Create a connection failure with structured reason.
    pub fn connection_failed(device_id: Option<String>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed { device_id, reason }
    }

    /// Turn any failure during a connect attempt into a connection error.
    ///
    /// Errors that already describe a connection failure are kept as-is.
    pub fn into_connection_error(self, device_id: &str) -> Self {
        let reason = match self {
            Self::ConnectionFailed { .. } => return self,
            Self::Timeout { .. } => ConnectionFailureReason::Timeout,
            Self::Bluetooth(e) => ConnectionFailureReason::BleError(e.to_string()),
            Self::CharacteristicNotFound { .. } | Self::NotConnected | Self::InvalidData(_) => {
                ConnectionFailureReason::StreamUnavailable(self.to_string())
            }
            other => ConnectionFailureReason::Other(other.to_string()),
        };
        Self::ConnectionFailed {
            device_id: Some(device_id.to_string()),
            reason,
        }
    }
}

/// Result type alias using neuroglove-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;

    #[test]
    fn test_error_display() {
        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to device");

        let err = Error::characteristic_not_found("00002a19", 3);
        assert!(err.to_string().contains("00002a19"));
        assert!(err.to_string().contains("3 services"));

        let err = Error::timeout("connect to device", Duration::from_secs(15));
        assert!(err.to_string().contains("connect to device"));
        assert!(err.to_string().contains("15s"));

        let err = Error::invalid_state("start discovery", SessionState::Connected);
        assert_eq!(err.to_string(), "Cannot start discovery while connected");

        let err = Error::validation("device id must not be empty");
        assert_eq!(
            err.to_string(),
            "Validation error: device id must not be empty"
        );
    }

    #[test]
    fn test_parse_error_conversion() {
        let parse = neuroglove_types::ParseError::out_of_range("Thumb", 200);
        let err: Error = parse.into();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(err.to_string().contains("Thumb must be 0-100"));
    }

    #[test]
    fn test_into_connection_error() {
        let err = Error::timeout("connect", Duration::from_secs(1)).into_connection_error("dev");
        match err {
            Error::ConnectionFailed { device_id, reason } => {
                assert_eq!(device_id.as_deref(), Some("dev"));
                assert_eq!(reason, ConnectionFailureReason::Timeout);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = Error::characteristic_not_found("x", 0).into_connection_error("dev");
        assert!(matches!(
            err,
            Error::ConnectionFailed {
                reason: ConnectionFailureReason::StreamUnavailable(_),
                ..
            }
        ));

        let original = Error::connection_failed(None, ConnectionFailureReason::AdapterUnavailable);
        let err = original.into_connection_error("dev");
        assert!(matches!(
            err,
            Error::ConnectionFailed {
                device_id: None,
                reason: ConnectionFailureReason::AdapterUnavailable
            }
        ));
    }

    #[test]
    fn test_connection_failure_reason_display() {
        assert_eq!(
            ConnectionFailureReason::AdapterUnavailable.to_string(),
            "Bluetooth adapter unavailable"
        );
        assert_eq!(
            ConnectionFailureReason::StreamUnavailable("no flex".into()).to_string(),
            "sensor stream unavailable: no flex"
        );
    }
}
