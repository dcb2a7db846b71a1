//! HTTP handlers
//!
//! Documented paths use the default `/api/v1` prefix; the live prefix comes
//! from the service configuration.

use axum::{
    extract::{Path, State},
    response::Json,
};
use tracing::debug;

use scalewire::DeviceDescriptor;

use crate::api::dto::{
    AppError, DeviceSummary, HealthResponse, RemovedDevice, ScaleCommandRequest, SuccessResponse,
};
use crate::api::AppState;
use crate::error::GatewayError;
use crate::executor::ExecutionOutcome;
use crate::manager::ReloadSummary;
use crate::store::DeviceStore;

/// Service liveness
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "up".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        devices: state.manager.device_count(),
    })
}

/// Run one logical command against a device.
///
/// Execution failures ride inside the outcome envelope with `success:false`;
/// the status stays 200 whenever the body parses.
#[utoipa::path(
    post,
    path = "/api/v1/scale/command",
    tag = "scale",
    request_body = ScaleCommandRequest,
    responses(
        (status = 200, description = "Command executed; see envelope", body = ExecutionOutcome),
        (status = 422, description = "Malformed request body")
    )
)]
pub async fn execute_command(
    State(state): State<AppState>,
    Json(request): Json<ScaleCommandRequest>,
) -> Json<ExecutionOutcome> {
    let outcome = state
        .executor
        .execute(&request.device_id, request.command)
        .await;
    Json(outcome)
}

/// List all devices with session state and counters
#[utoipa::path(
    get,
    path = "/api/v1/devices",
    tag = "devices",
    responses(
        (status = 200, description = "Device summaries", body = SuccessResponse<Vec<DeviceSummary>>)
    )
)]
pub async fn list_devices(
    State(state): State<AppState>,
) -> Json<SuccessResponse<Vec<DeviceSummary>>> {
    let summaries: Vec<DeviceSummary> = state
        .manager
        .list()
        .into_iter()
        .map(DeviceSummary::from)
        .collect();
    Json(SuccessResponse::new(summaries))
}

/// Full descriptor of one device
#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}",
    tag = "devices",
    params(("id" = String, Path, description = "Device id")),
    responses(
        (status = 200, description = "Device descriptor", body = SuccessResponse<DeviceDescriptor>),
        (status = 404, description = "Unknown device", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse<DeviceDescriptor>>, AppError> {
    let descriptor = state
        .manager
        .get(&id)
        .ok_or_else(|| GatewayError::device_not_found(&id))?;
    Ok(Json(SuccessResponse::new((*descriptor).clone())))
}

/// Create or replace a device.
///
/// The id in the path wins over the one in the body. The descriptor is
/// validated, persisted to the device file, then applied to the registry.
#[utoipa::path(
    put,
    path = "/api/v1/devices/{id}",
    tag = "devices",
    params(("id" = String, Path, description = "Device id")),
    request_body = DeviceDescriptor,
    responses(
        (status = 200, description = "Stored descriptor", body = SuccessResponse<DeviceDescriptor>),
        (status = 400, description = "Validation failed", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn put_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut descriptor): Json<DeviceDescriptor>,
) -> Result<Json<SuccessResponse<DeviceDescriptor>>, AppError> {
    descriptor.id = id;

    {
        let mut store = state
            .store
            .lock()
            .map_err(|_| AppError::internal_error("device store lock poisoned"))?;
        store.upsert(descriptor.clone())?;
        store.save()?;
    }

    state.manager.apply_device(descriptor.clone())?;
    Ok(Json(SuccessResponse::new(descriptor)))
}

/// Remove a device; its session is closed
#[utoipa::path(
    delete,
    path = "/api/v1/devices/{id}",
    tag = "devices",
    params(("id" = String, Path, description = "Device id")),
    responses(
        (status = 200, description = "Device removed", body = SuccessResponse<RemovedDevice>),
        (status = 404, description = "Unknown device", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse<RemovedDevice>>, AppError> {
    let removed = {
        let mut store = state
            .store
            .lock()
            .map_err(|_| AppError::internal_error("device store lock poisoned"))?;
        let removed = store.remove(&id)?;
        store.save()?;
        removed
    };

    if let Err(e) = state.manager.remove_device(&id) {
        debug!("Device {} was not in the registry: {}", id, e);
    }
    Ok(Json(SuccessResponse::new(RemovedDevice { id: removed.id })))
}

/// Re-read the device file and swap the registry to match it
#[utoipa::path(
    post,
    path = "/api/v1/devices/reload",
    tag = "devices",
    responses(
        (status = 200, description = "Reload counts", body = SuccessResponse<ReloadSummary>),
        (status = 400, description = "Device file invalid", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn reload_devices(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<ReloadSummary>>, AppError> {
    let snapshot = {
        let mut store = state
            .store
            .lock()
            .map_err(|_| AppError::internal_error("device store lock poisoned"))?;
        let fresh = DeviceStore::load(store.path())?;
        let snapshot = fresh.snapshot();
        *store = fresh;
        snapshot
    };

    let summary = state.manager.apply_snapshot(snapshot)?;
    Ok(Json(SuccessResponse::new(summary)))
}
