//! REST API: router, shared state and OpenAPI document

use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[cfg(feature = "swagger-ui")]
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ServiceConfig;
use crate::executor::CommandExecutor;
use crate::manager::DeviceManager;
use crate::store::DeviceStore;

pub mod dto;
pub mod handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::execute_command,
        handlers::list_devices,
        handlers::get_device,
        handlers::put_device,
        handlers::delete_device,
        handlers::reload_devices,
    ),
    components(
        schemas(
            // Protocol library models
            scalewire::LogicalCommand,
            scalewire::ScaleProtocol,
            scalewire::ConnectionSettings,
            scalewire::Parity,
            scalewire::StopBits,
            scalewire::FlowControl,
            scalewire::CommandMap,
            scalewire::DeviceDescriptor,
            scalewire::WeightReading,
            scalewire::Stability,
            scalewire::SessionState,
            scalewire::SessionStats,
            // Service models
            crate::executor::ExecutionOutcome,
            crate::manager::ReloadSummary,
            dto::ScaleCommandRequest,
            dto::DeviceSummary,
            dto::RemovedDevice,
            dto::HealthResponse,
            dto::ErrorInfo,
            dto::ErrorResponse,
        )
    ),
    tags(
        (name = "scale", description = "Logical command execution"),
        (name = "devices", description = "Device registry management"),
        (name = "health", description = "Liveness probe")
    ),
    info(
        title = "Scalesrv Weighing Gateway API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Protocol gateway for weighing indicators (RINCMD, DFW_ASCII)"
    )
)]
pub struct ApiDoc;

/// Shared state behind every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub manager: Arc<DeviceManager>,
    pub executor: CommandExecutor,
    pub store: Arc<Mutex<DeviceStore>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServiceConfig, manager: Arc<DeviceManager>, store: DeviceStore) -> Self {
        Self {
            executor: CommandExecutor::new(Arc::clone(&manager)),
            config: Arc::new(config),
            manager,
            store: Arc::new(Mutex::new(store)),
            started_at: Instant::now(),
        }
    }
}

/// Build the service router. Everything except `/health` (and the Swagger
/// routes) lives under the configured prefix.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/scale/command", post(handlers::execute_command))
        .route("/devices", get(handlers::list_devices))
        .route(
            "/devices/{id}",
            get(handlers::get_device)
                .put(handlers::put_device)
                .delete(handlers::delete_device),
        )
        .route("/devices/reload", post(handlers::reload_devices));

    let router = Router::new()
        .route("/health", get(handlers::health))
        .nest(&state.config.api.prefix, api);

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));

    router
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
