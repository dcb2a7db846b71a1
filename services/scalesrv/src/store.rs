//! Device store
//!
//! The registry's external configuration collaborator: a JSON file holding
//! `{ "devices": [DeviceDescriptor...] }`. The store owns the file path and
//! an in-memory copy; mutations go through [`DeviceStore::save`], which
//! writes pretty JSON to a temp file and renames it into place so a crash
//! mid-write never truncates the previous file.

use std::fs;
use std::path::{Path, PathBuf};

use scalewire::DeviceDescriptor;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GatewayError, Result};

/// On-disk shape of the device file
#[derive(Debug, Default, Serialize, Deserialize)]
struct DeviceFile {
    #[serde(default)]
    devices: Vec<DeviceDescriptor>,
}

/// In-memory device list bound to its backing file
#[derive(Debug)]
pub struct DeviceStore {
    path: PathBuf,
    devices: Vec<DeviceDescriptor>,
}

impl DeviceStore {
    /// Load the store from `path`. A missing file is an empty store; a
    /// present file must parse, validate, and contain no duplicate ids.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            info!("Device file {} not found, starting empty", path.display());
            return Ok(Self {
                path,
                devices: Vec::new(),
            });
        }

        let raw = fs::read_to_string(&path)?;
        let file: DeviceFile = serde_json::from_str(&raw)
            .map_err(|e| GatewayError::config(format!("{}: {}", path.display(), e)))?;

        for descriptor in &file.devices {
            descriptor.validate()?;
        }
        Self::check_duplicates(&file.devices)?;

        info!(
            "Loaded {} device(s) from {}",
            file.devices.len(),
            path.display()
        );
        Ok(Self {
            path,
            devices: file.devices,
        })
    }

    fn check_duplicates(devices: &[DeviceDescriptor]) -> Result<()> {
        for (i, descriptor) in devices.iter().enumerate() {
            if devices[..i].iter().any(|d| d.id == descriptor.id) {
                return Err(GatewayError::config(format!(
                    "Duplicate device id: {}",
                    descriptor.id
                )));
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&DeviceDescriptor> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Clone of the current device list, in file order
    pub fn snapshot(&self) -> Vec<DeviceDescriptor> {
        self.devices.clone()
    }

    /// Insert or replace by id. Returns true when the device was new.
    pub fn upsert(&mut self, descriptor: DeviceDescriptor) -> Result<bool> {
        descriptor.validate()?;

        match self.devices.iter_mut().find(|d| d.id == descriptor.id) {
            Some(slot) => {
                *slot = descriptor;
                Ok(false)
            }
            None => {
                self.devices.push(descriptor);
                Ok(true)
            }
        }
    }

    /// Remove by id, returning the removed descriptor
    pub fn remove(&mut self, id: &str) -> Result<DeviceDescriptor> {
        match self.devices.iter().position(|d| d.id == id) {
            Some(pos) => Ok(self.devices.remove(pos)),
            None => Err(GatewayError::device_not_found(id)),
        }
    }

    /// Persist the current list: pretty JSON to a temp file, then rename
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = DeviceFile {
            devices: self.devices.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        info!(
            "Saved {} device(s) to {}",
            self.devices.len(),
            self.path.display()
        );
        Ok(())
    }
}
