//! Error handling for the scalewire protocol library
//!
//! All wire-level failures funnel into [`WireError`]. The service layer maps
//! these onto its own taxonomy at the API boundary.

use thiserror::Error;

/// Wire-level error for codecs, transports and sessions
#[derive(Error, Debug, Clone)]
pub enum WireError {
    /// Descriptor or parameter problems detected before touching the wire
    #[error("Config error: {0}")]
    ConfigError(String),

    /// TCP connect or serial open failed (refused, unreachable, timed out)
    #[error("Connect error: {0}")]
    ConnectError(String),

    /// IO failure outside an exchange (write setup, port control)
    #[error("IO error: {0}")]
    IoError(String),

    /// Connected but no complete response within the device timeout
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// Peer closed or errored mid-exchange; the link must be re-established
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Response bytes did not form a valid protocol frame
    #[error("Decode error: {0}")]
    DecodeError(String),
}

/// Result type alias for the scalewire library
pub type WireResult<T> = std::result::Result<T, WireError>;

impl WireError {
    pub fn config(msg: impl Into<String>) -> Self {
        WireError::ConfigError(msg.into())
    }

    pub fn connect(msg: impl Into<String>) -> Self {
        WireError::ConnectError(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        WireError::IoError(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        WireError::TimeoutError(msg.into())
    }

    pub fn connection_lost(msg: impl Into<String>) -> Self {
        WireError::ConnectionLost(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        WireError::DecodeError(msg.into())
    }

    /// True for failures the executor may retry once after a reconnect
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, WireError::ConnectionLost(_))
    }
}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        WireError::IoError(err.to_string())
    }
}
