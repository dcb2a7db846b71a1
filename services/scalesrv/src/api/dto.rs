//! API request/response models
//!
//! Non-command endpoints share one envelope pair: [`SuccessResponse`] for
//! data and [`ErrorResponse`] for failures, the latter produced through
//! [`AppError`]. The command endpoint answers with the executor's own
//! outcome envelope instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use scalewire::{LogicalCommand, ScaleProtocol, SessionState, SessionStats};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::GatewayError;
use crate::manager::DeviceOverview;

/// Standard success envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse<T> {
    /// Always true
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Error payload carried by [`ErrorResponse`]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorInfo {
    /// Stable error kind, e.g. `device_not_found`
    #[schema(example = "device_not_found")]
    pub code: String,
    pub message: String,
}

/// Standard error envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    pub error: ErrorInfo,
}

/// Gateway error paired with its HTTP status, ready to leave a handler
#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub error: ErrorInfo,
}

impl AppError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ErrorInfo {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            message,
        )
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        Self::new(err.status_code(), err.kind_str(), err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                success: false,
                error: self.error,
            }),
        )
            .into_response()
    }
}

/// Body of `POST /scale/command`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScaleCommandRequest {
    /// Registry id of the target device
    #[schema(example = "dock-1")]
    pub device_id: String,
    /// Logical command to run
    #[schema(example = "readGross")]
    pub command: LogicalCommand,
}

/// One row of the device listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceSummary {
    #[schema(example = "dock-1")]
    pub id: String,
    #[schema(example = "Dock scale")]
    pub name: String,
    pub protocol: ScaleProtocol,
    /// `tcp` or `serial`
    #[schema(example = "tcp")]
    pub connection_type: String,
    #[schema(example = "10.0.0.50:4001")]
    pub endpoint: String,
    pub enabled: bool,
    pub state: SessionState,
    pub stats: SessionStats,
}

impl From<DeviceOverview> for DeviceSummary {
    fn from(overview: DeviceOverview) -> Self {
        Self {
            id: overview.descriptor.id.clone(),
            name: overview.descriptor.name.clone(),
            protocol: overview.descriptor.protocol,
            connection_type: overview.descriptor.connection.kind().to_string(),
            endpoint: overview.descriptor.connection.endpoint(),
            enabled: overview.descriptor.enabled,
            state: overview.state,
            stats: overview.stats,
        }
    }
}

/// Confirmation payload for `DELETE /devices/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RemovedDevice {
    #[schema(example = "dock-1")]
    pub id: String,
}

/// Liveness payload for `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "up")]
    pub status: String,
    #[schema(example = "scalesrv")]
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Devices currently in the registry
    pub devices: usize,
}
