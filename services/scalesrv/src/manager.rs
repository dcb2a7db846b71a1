//! Device registry
//!
//! [`DeviceManager`] owns one entry per configured device: the descriptor
//! and the live session handle. Lookups are lock-free reads on a concurrent
//! map. Reload builds the new entries first and closes replaced sessions
//! only after the swap, so commands in flight on surviving devices never
//! stall behind a reload.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use scalewire::{
    Connector, DeviceDescriptor, DeviceSession, NetConnector, SessionHandle, SessionState,
    SessionStats,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GatewayError, Result};

/// Registry entry for one device
#[derive(Clone)]
struct DeviceEntry {
    descriptor: Arc<DeviceDescriptor>,
    session: SessionHandle,
    #[allow(dead_code)]
    created_at: Instant,
}

/// Point-in-time view of one device for listings
#[derive(Debug, Clone)]
pub struct DeviceOverview {
    pub descriptor: Arc<DeviceDescriptor>,
    pub state: SessionState,
    pub stats: SessionStats,
}

/// Counts reported by a registry reload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReloadSummary {
    /// Devices in the registry after the reload
    pub total: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// How one descriptor landed in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedChange {
    Added,
    Updated,
    Unchanged,
}

/// Thread-safe registry of devices and their sessions
#[derive(Default)]
pub struct DeviceManager {
    devices: DashMap<String, DeviceEntry>,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
        }
    }

    fn build_entry(descriptor: DeviceDescriptor) -> DeviceEntry {
        let descriptor = Arc::new(descriptor);
        let connector: Arc<dyn Connector> = Arc::new(NetConnector::from_descriptor(&descriptor));
        let session = DeviceSession::spawn(Arc::clone(&descriptor), connector);
        DeviceEntry {
            descriptor,
            session,
            created_at: Instant::now(),
        }
    }

    /// Insert or refresh one device. An unchanged descriptor keeps its
    /// session (and any live connection); a changed one gets a fresh
    /// session, and the old one is closed after the swap.
    pub fn apply_device(&self, descriptor: DeviceDescriptor) -> Result<AppliedChange> {
        descriptor.validate()?;
        let id = descriptor.id.clone();

        let unchanged = self
            .devices
            .get(&id)
            .map(|entry| *entry.descriptor == descriptor);

        match unchanged {
            Some(true) => {
                debug!("Device {} unchanged, keeping session", id);
                Ok(AppliedChange::Unchanged)
            }
            Some(false) => {
                let entry = Self::build_entry(descriptor);
                let endpoint = entry.descriptor.connection.endpoint();
                let protocol = entry.descriptor.protocol;
                let old = self.devices.insert(id.clone(), entry);
                if let Some(old) = old {
                    old.session.close();
                }
                info!("Device {} updated ({}, {})", id, protocol, endpoint);
                Ok(AppliedChange::Updated)
            }
            None => {
                let entry = Self::build_entry(descriptor);
                let endpoint = entry.descriptor.connection.endpoint();
                let protocol = entry.descriptor.protocol;
                self.devices.insert(id.clone(), entry);
                info!("Device {} registered ({}, {})", id, protocol, endpoint);
                Ok(AppliedChange::Added)
            }
        }
    }

    /// Remove a device and close its session
    pub fn remove_device(&self, id: &str) -> Result<()> {
        match self.devices.remove(id) {
            Some((_, entry)) => {
                entry.session.close();
                info!("Device {} removed", id);
                Ok(())
            }
            None => Err(GatewayError::device_not_found(id)),
        }
    }

    /// Replace the whole registry with `devices`, diffing per id.
    ///
    /// Replaced and dropped sessions are closed only after their entries
    /// have left the map.
    pub fn apply_snapshot(&self, devices: Vec<DeviceDescriptor>) -> Result<ReloadSummary> {
        let mut summary = ReloadSummary::default();
        let keep: Vec<String> = devices.iter().map(|d| d.id.clone()).collect();

        for descriptor in devices {
            match self.apply_device(descriptor)? {
                AppliedChange::Added => summary.added += 1,
                AppliedChange::Updated => summary.updated += 1,
                AppliedChange::Unchanged => summary.unchanged += 1,
            }
        }

        let stale: Vec<String> = self
            .devices
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|id| !keep.contains(id))
            .collect();
        for id in stale {
            if let Some((_, entry)) = self.devices.remove(&id) {
                entry.session.close();
                info!("Device {} removed", id);
                summary.removed += 1;
            }
        }

        summary.total = self.devices.len();
        info!(
            "Registry reloaded: {} device(s) ({} added, {} updated, {} removed, {} unchanged)",
            summary.total, summary.added, summary.updated, summary.removed, summary.unchanged
        );
        Ok(summary)
    }

    /// Execution-path lookup: id must exist and the device must be enabled
    pub fn lookup(&self, id: &str) -> Result<(Arc<DeviceDescriptor>, SessionHandle)> {
        let entry = self
            .devices
            .get(id)
            .ok_or_else(|| GatewayError::device_not_found(id))?;
        if !entry.descriptor.enabled {
            return Err(GatewayError::device_disabled(id));
        }
        Ok((Arc::clone(&entry.descriptor), entry.session.clone()))
    }

    /// Full descriptor, enabled or not
    pub fn get(&self, id: &str) -> Option<Arc<DeviceDescriptor>> {
        self.devices
            .get(id)
            .map(|entry| Arc::clone(&entry.descriptor))
    }

    /// Snapshot of every device with its session state and stats, sorted by
    /// id for stable listings
    pub fn list(&self) -> Vec<DeviceOverview> {
        let mut overviews: Vec<DeviceOverview> = self
            .devices
            .iter()
            .map(|entry| DeviceOverview {
                descriptor: Arc::clone(&entry.descriptor),
                state: entry.session.state(),
                stats: entry.session.stats(),
            })
            .collect();
        overviews.sort_by(|a, b| a.descriptor.id.cmp(&b.descriptor.id));
        overviews
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Close every session. Queued commands are answered with the
    /// session-closed error by the actors as they drain.
    pub fn shutdown(&self) {
        let count = self.devices.len();
        if count > 0 {
            info!("Closing {} device session(s)", count);
        }
        for entry in self.devices.iter() {
            entry.session.close();
        }
        self.devices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalewire::{CommandMap, ConnectionSettings, ScaleProtocol};

    fn descriptor(id: &str, port: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            id: id.to_string(),
            name: format!("Scale {}", id),
            manufacturer: "Rinstrum".to_string(),
            model: "C320".to_string(),
            protocol: ScaleProtocol::Rincmd,
            connection: ConnectionSettings::Tcp {
                host: "127.0.0.1".to_string(),
                port,
            },
            timeout_ms: 200,
            command_map: CommandMap::rincmd_defaults(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn apply_device_distinguishes_added_updated_unchanged() {
        let manager = DeviceManager::new();

        assert_eq!(
            manager.apply_device(descriptor("lane-1", 4001)).unwrap(),
            AppliedChange::Added
        );
        assert_eq!(
            manager.apply_device(descriptor("lane-1", 4001)).unwrap(),
            AppliedChange::Unchanged
        );
        assert_eq!(
            manager.apply_device(descriptor("lane-1", 4002)).unwrap(),
            AppliedChange::Updated
        );
        assert_eq!(manager.device_count(), 1);
    }

    #[tokio::test]
    async fn unchanged_device_keeps_its_session() {
        let manager = DeviceManager::new();
        manager.apply_device(descriptor("lane-1", 4001)).unwrap();
        let (_, before) = manager.lookup("lane-1").unwrap();

        manager.apply_device(descriptor("lane-1", 4001)).unwrap();
        let (_, after) = manager.lookup("lane-1").unwrap();

        // Closing the first handle kills the second: same actor behind both.
        // A replaced session would fail with a connect error instead.
        before.close();
        let err = after
            .execute(scalewire::LogicalCommand::Tare, "TARE")
            .await
            .unwrap_err();
        assert!(err.is_connection_lost());
    }

    #[tokio::test]
    async fn lookup_enforces_enabled() {
        let manager = DeviceManager::new();
        let mut disabled = descriptor("lane-2", 4001);
        disabled.enabled = false;
        manager.apply_device(disabled).unwrap();

        assert!(matches!(
            manager.lookup("lane-2"),
            Err(GatewayError::DeviceDisabled(_))
        ));
        assert!(matches!(
            manager.lookup("lane-9"),
            Err(GatewayError::DeviceNotFound(_))
        ));
        // Disabled devices still show up in listings
        assert_eq!(manager.list().len(), 1);
        assert!(manager.get("lane-2").is_some());
    }

    #[tokio::test]
    async fn apply_snapshot_reports_diff_counts() {
        let manager = DeviceManager::new();
        manager.apply_device(descriptor("lane-1", 4001)).unwrap();
        manager.apply_device(descriptor("lane-2", 4001)).unwrap();
        manager.apply_device(descriptor("lane-3", 4001)).unwrap();

        // lane-1 unchanged, lane-2 changed, lane-3 dropped, lane-4 new
        let summary = manager
            .apply_snapshot(vec![
                descriptor("lane-1", 4001),
                descriptor("lane-2", 4010),
                descriptor("lane-4", 4001),
            ])
            .unwrap();

        assert_eq!(
            summary,
            ReloadSummary {
                total: 3,
                added: 1,
                updated: 1,
                removed: 1,
                unchanged: 1,
            }
        );
        assert!(manager.get("lane-3").is_none());
        assert!(manager.get("lane-4").is_some());
    }

    #[tokio::test]
    async fn list_is_sorted_by_id() {
        let manager = DeviceManager::new();
        manager.apply_device(descriptor("zulu", 4001)).unwrap();
        manager.apply_device(descriptor("alpha", 4001)).unwrap();
        manager.apply_device(descriptor("mike", 4001)).unwrap();

        let ids: Vec<String> = manager
            .list()
            .iter()
            .map(|o| o.descriptor.id.clone())
            .collect();
        assert_eq!(ids, vec!["alpha", "mike", "zulu"]);
    }

    #[tokio::test]
    async fn remove_closes_and_forgets() {
        let manager = DeviceManager::new();
        manager.apply_device(descriptor("lane-1", 4001)).unwrap();
        let (_, session) = manager.lookup("lane-1").unwrap();

        manager.remove_device("lane-1").unwrap();
        assert_eq!(manager.device_count(), 0);
        assert!(matches!(
            manager.remove_device("lane-1"),
            Err(GatewayError::DeviceNotFound(_))
        ));

        // The closed session answers instead of hanging
        let err = session
            .execute(scalewire::LogicalCommand::Tare, "TARE")
            .await
            .unwrap_err();
        assert!(err.is_connection_lost());
    }

    #[tokio::test]
    async fn shutdown_closes_every_session() {
        let manager = DeviceManager::new();
        manager.apply_device(descriptor("lane-1", 4001)).unwrap();
        manager.apply_device(descriptor("lane-2", 4001)).unwrap();
        let (_, s1) = manager.lookup("lane-1").unwrap();

        manager.shutdown();
        assert_eq!(manager.device_count(), 0);
        let err = s1
            .execute(scalewire::LogicalCommand::Zero, "ZERO")
            .await
            .unwrap_err();
        assert!(err.is_connection_lost());
    }
}
