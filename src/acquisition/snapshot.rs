/*!
Replay of previously captured per-device interface results.

A snapshot file is a JSON array, one entry per device, in collection order. Each entry carries
the device name and exactly one of `interfaces`, `error`, `auth_error` or `feature_not_found`:

```json
[
  { "device": "A", "interfaces": [ { "name": "eth0", "ip_address": "10.0.0.1/30" } ] },
  { "device": "D", "error": "GRPC ERROR Host: 172.20.20.14:57400, Error: unavailable" },
  { "device": "E", "feature_not_found": "openconfig-interfaces" }
]
```

`InterfaceSnapshot` serves both as a `DeviceRegistry` (devices in entry order) and an
`InterfaceFetcher`.
*/

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    acquisition::core::{DeviceRegistry, FetchError, InterfaceFetcher, RegistryError},
    network::device::{DeviceId, RawInterface},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub device: DeviceId,
    #[serde(flatten)]
    pub result: SnapshotResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotResult {
    Interfaces(Vec<RawInterface>),
    Error(String),
    AuthError(String),
    FeatureNotFound(String),
}

impl From<SnapshotResult> for Result<Vec<RawInterface>, FetchError> {
    fn from(value: SnapshotResult) -> Self {
        match value {
            SnapshotResult::Interfaces(interfaces) => Ok(interfaces),
            SnapshotResult::Error(message) => Err(FetchError::Transport(message)),
            SnapshotResult::AuthError(message) => Err(FetchError::Auth(message)),
            SnapshotResult::FeatureNotFound(feature) => Err(FetchError::FeatureNotConfigured {
                feature,
                message: "Feature not available".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InterfaceSnapshot {
    order: Vec<DeviceId>,
    results: HashMap<DeviceId, Result<Vec<RawInterface>, FetchError>>,
}

impl InterfaceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<SnapshotEntry>) -> Self {
        entries
            .into_iter()
            .fold(Self::new(), |snapshot, entry| snapshot.with_result(entry.device, entry.result.into()))
    }

    pub async fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RegistryError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let entries: Vec<SnapshotEntry> =
            serde_json::from_str(&raw).map_err(|source| RegistryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_entries(entries))
    }

    /// Records the result for a device. A device recorded twice keeps its first position.
    pub fn with_result(
        mut self,
        device: impl Into<DeviceId>,
        result: Result<Vec<RawInterface>, FetchError>,
    ) -> Self {
        let device = device.into();
        if !self.results.contains_key(&device) {
            self.order.push(device.clone());
        }
        self.results.insert(device, result);
        self
    }

    pub fn with_interfaces(self, device: impl Into<DeviceId>, interfaces: Vec<RawInterface>) -> Self {
        self.with_result(device, Ok(interfaces))
    }

    pub fn with_error(self, device: impl Into<DeviceId>, error: FetchError) -> Self {
        self.with_result(device, Err(error))
    }
}

#[async_trait]
impl DeviceRegistry for InterfaceSnapshot {
    async fn list_devices(&self) -> Result<Vec<DeviceId>, RegistryError> {
        Ok(self.order.clone())
    }
}

#[async_trait]
impl InterfaceFetcher for InterfaceSnapshot {
    async fn fetch_interfaces(&self, device: &DeviceId) -> Result<Vec<RawInterface>, FetchError> {
        self.results
            .get(device)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::UnknownDevice(device.clone())))
    }
}
