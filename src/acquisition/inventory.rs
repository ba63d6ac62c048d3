/*!
JSON file inventory.

The inventory file is a JSON array of device entries:

```json
[
  { "name": "xrd-1", "ip_address": "172.20.20.11", "port": 57400, "nos": "iosxr" },
  { "name": "xrd-2", "ip_address": "172.20.20.12", "port": 57400, "nos": "iosxr" }
]
```

Only `name` is required; credentials and other fields are ignored here since they are the
fetcher's business. Device order in the file is the collection order.
*/

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    acquisition::core::{DeviceRegistry, RegistryError},
    network::device::DeviceId,
};

pub const INVENTORY_ENV_VAR: &str = "NETWORK_INVENTORY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub name: DeviceId,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub nos: Option<String>,
}

/// Device registry backed by a JSON inventory file. The file is re-read on every listing.
#[derive(Debug, Clone)]
pub struct JsonInventory {
    path: PathBuf,
}

impl JsonInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves the inventory path from an explicit argument, falling back to `NETWORK_INVENTORY`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, RegistryError> {
        resolve_path(explicit, std::env::var_os(INVENTORY_ENV_VAR).map(PathBuf::from))
            .map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<InventoryEntry>, RegistryError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RegistryError::Io {
                path: self.path.clone(),
                source,
            })?;
        parse_inventory(&raw).map_err(|e| match e {
            InventoryParseError::Json(source) => RegistryError::Parse {
                path: self.path.clone(),
                source,
            },
            InventoryParseError::Duplicate(id) => RegistryError::DuplicateDevice(id),
        })
    }
}

#[async_trait]
impl DeviceRegistry for JsonInventory {
    async fn list_devices(&self) -> Result<Vec<DeviceId>, RegistryError> {
        let entries = self.load().await?;
        debug!(path = %self.path.display(), devices = entries.len(), "loaded inventory");
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }
}

/// A fixed, in-memory device list.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    devices: Vec<DeviceId>,
}

impl StaticRegistry {
    pub fn new(devices: impl IntoIterator<Item = impl Into<DeviceId>>) -> Self {
        Self {
            devices: devices.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl DeviceRegistry for StaticRegistry {
    async fn list_devices(&self) -> Result<Vec<DeviceId>, RegistryError> {
        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(device) {
                return Err(RegistryError::DuplicateDevice(device.clone()));
            }
        }
        Ok(self.devices.clone())
    }
}

enum InventoryParseError {
    Json(serde_json::Error),
    Duplicate(DeviceId),
}

fn parse_inventory(raw: &str) -> Result<Vec<InventoryEntry>, InventoryParseError> {
    let entries: Vec<InventoryEntry> = serde_json::from_str(raw).map_err(InventoryParseError::Json)?;
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if !seen.insert(&entry.name) {
            return Err(InventoryParseError::Duplicate(entry.name.clone()));
        }
    }
    Ok(entries)
}

fn resolve_path(explicit: Option<&Path>, env: Option<PathBuf>) -> Result<PathBuf, RegistryError> {
    match (explicit, env) {
        (Some(path), _) => Ok(path.to_path_buf()),
        (None, Some(path)) if !path.as_os_str().is_empty() => Ok(path),
        _ => Err(RegistryError::MissingPath),
    }
}
