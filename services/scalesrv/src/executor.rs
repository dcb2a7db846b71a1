//! Command executor
//!
//! Validates a logical command against the registry, runs it through the
//! device session, and folds every path into an [`ExecutionOutcome`]. The
//! executor never panics and never touches a session before validation has
//! passed.

use std::sync::Arc;

use chrono::Utc;
use scalewire::{LogicalCommand, WeightReading};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};
use crate::manager::DeviceManager;

/// Uniform result envelope for the command endpoint.
///
/// `result` and `error` are always present, null when not applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub device_id: String,
    pub command: LogicalCommand,
    pub result: Option<WeightReading>,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn success(
        device_id: impl Into<String>,
        command: LogicalCommand,
        result: Option<WeightReading>,
    ) -> Self {
        Self {
            success: true,
            device_id: device_id.into(),
            command,
            result,
            error: None,
        }
    }

    pub fn failure(
        device_id: impl Into<String>,
        command: LogicalCommand,
        error: &GatewayError,
    ) -> Self {
        Self {
            success: false,
            device_id: device_id.into(),
            command,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

/// Runs logical commands against registered devices
#[derive(Clone)]
pub struct CommandExecutor {
    manager: Arc<DeviceManager>,
}

impl CommandExecutor {
    pub fn new(manager: Arc<DeviceManager>) -> Self {
        Self { manager }
    }

    /// Execute one command. Every failure comes back inside the outcome.
    pub async fn execute(&self, device_id: &str, command: LogicalCommand) -> ExecutionOutcome {
        match self.run(device_id, command).await {
            Ok(result) => ExecutionOutcome::success(device_id, command, result),
            Err(e) => {
                warn!("[{}] {} failed: {} ({})", device_id, command, e, e.kind_str());
                ExecutionOutcome::failure(device_id, command, &e)
            }
        }
    }

    async fn run(
        &self,
        device_id: &str,
        command: LogicalCommand,
    ) -> Result<Option<WeightReading>> {
        // Validation first; none of these reach the session
        let (descriptor, session) = self.manager.lookup(device_id)?;
        let token = descriptor
            .command_map
            .token(command)
            .ok_or_else(|| GatewayError::command_not_mapped(device_id, command))?
            .to_string();

        // One immediate retry, only when the link dropped mid-exchange.
        // The session reconnects lazily on the retry.
        let response = match session.execute(command, &token).await {
            Ok(response) => response,
            Err(e) if e.is_connection_lost() => {
                debug!("[{}] {} lost the connection, retrying once", device_id, command);
                session.execute(command, &token).await?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(response
            .into_reading()
            .map(|reading| reading.stamped(Utc::now())))
    }
}
