//! scalesrv: weighing scale protocol gateway
//!
//! Exposes an HTTP API for executing logical weighing commands (read gross,
//! read net, tare, zero) against configured scale devices. Protocol
//! translation and transport live in the `scalewire` library; this crate
//! adds the device registry, command execution pipeline, persistence and
//! the management API on top.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod executor;
pub mod manager;
pub mod store;

pub use config::ServiceConfig;
pub use error::{GatewayError, Result};
pub use executor::{CommandExecutor, ExecutionOutcome};
pub use manager::{DeviceManager, ReloadSummary};
pub use store::DeviceStore;
