//! Service-level error taxonomy
//!
//! [`GatewayError`] is the single error type the API layer and executor work
//! with. Wire failures from the protocol library convert into it, and every
//! variant knows its envelope kind string and its HTTP projection.

use axum::http::StatusCode;
use scalewire::{LogicalCommand, WireError};
use thiserror::Error;

/// Gateway error covering validation, execution and service faults
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device disabled: {0}")]
    DeviceDisabled(String),

    #[error("Command {command} not mapped for device {device_id}")]
    CommandNotMapped {
        device_id: String,
        command: LogicalCommand,
    },

    #[error("Connect error: {0}")]
    ConnectError(String),

    #[error("Read timeout: {0}")]
    ReadTimeout(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type alias for the gateway service
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    pub fn device_not_found(id: impl Into<String>) -> Self {
        Self::DeviceNotFound(id.into())
    }

    pub fn device_disabled(id: impl Into<String>) -> Self {
        Self::DeviceDisabled(id.into())
    }

    pub fn command_not_mapped(device_id: impl Into<String>, command: LogicalCommand) -> Self {
        Self::CommandNotMapped {
            device_id: device_id.into(),
            command,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// Stable kind identifier used in error envelopes and logs
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::DeviceNotFound(_) => "device_not_found",
            Self::DeviceDisabled(_) => "device_disabled",
            Self::CommandNotMapped { .. } => "command_not_mapped",
            Self::ConnectError(_) => "connect_error",
            Self::ReadTimeout(_) => "read_timeout",
            Self::ConnectionLost(_) => "connection_lost",
            Self::DecodeError(_) => "decode_error",
            Self::ConfigError(_) => "config_error",
            Self::IoError(_) => "io_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// HTTP projection for endpoints that surface errors as status codes.
    ///
    /// The command endpoint does not use this after validation; execution
    /// failures ride in a 200 outcome envelope.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            Self::DeviceDisabled(_) | Self::CommandNotMapped { .. } | Self::ConfigError(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ConnectError(_)
            | Self::ReadTimeout(_)
            | Self::ConnectionLost(_)
            | Self::DecodeError(_) => StatusCode::BAD_GATEWAY,
            Self::IoError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True only for the kind the executor retries once
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }
}

impl From<WireError> for GatewayError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::ConfigError(msg) => Self::ConfigError(msg),
            WireError::ConnectError(msg) => Self::ConnectError(msg),
            WireError::IoError(msg) => Self::IoError(msg),
            WireError::TimeoutError(msg) => Self::ReadTimeout(msg),
            WireError::ConnectionLost(msg) => Self::ConnectionLost(msg),
            WireError::DecodeError(msg) => Self::DecodeError(msg),
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<figment::Error> for GatewayError {
    fn from(err: figment::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_snake_case() {
        assert_eq!(
            GatewayError::device_not_found("x").kind_str(),
            "device_not_found"
        );
        assert_eq!(
            GatewayError::command_not_mapped("x", LogicalCommand::Tare).kind_str(),
            "command_not_mapped"
        );
        assert_eq!(
            GatewayError::from(WireError::timeout("slow")).kind_str(),
            "read_timeout"
        );
    }

    #[test]
    fn http_projection_matches_taxonomy() {
        assert_eq!(
            GatewayError::device_not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::device_disabled("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::command_not_mapped("x", LogicalCommand::Zero).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::from(WireError::connect("refused")).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::from(WireError::connection_lost("reset")).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::internal("bug").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn only_connection_lost_is_retryable() {
        assert!(GatewayError::from(WireError::connection_lost("reset")).is_retryable());
        assert!(!GatewayError::from(WireError::timeout("slow")).is_retryable());
        assert!(!GatewayError::from(WireError::connect("refused")).is_retryable());
        assert!(!GatewayError::device_not_found("x").is_retryable());
    }

    #[test]
    fn wire_errors_map_onto_service_kinds() {
        assert!(matches!(
            GatewayError::from(WireError::decode("junk")),
            GatewayError::DecodeError(_)
        ));
        assert!(matches!(
            GatewayError::from(WireError::config("bad token")),
            GatewayError::ConfigError(_)
        ));
        assert!(matches!(
            GatewayError::from(WireError::io("pipe")),
            GatewayError::IoError(_)
        ));
    }
}
