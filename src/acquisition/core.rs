use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::network::device::{DeviceId, RawInterface};

/// Source of the device identities to survey (the inventory).
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Lists the devices in inventory order. That order decides link direction downstream.
    async fn list_devices(&self) -> Result<Vec<DeviceId>, RegistryError>;
}

/// Retrieves the raw interface/IP state of a single device.
/// Retries and per-call timeouts belong to implementations of this trait.
#[async_trait]
pub trait InterfaceFetcher: Send + Sync {
    async fn fetch_interfaces(&self, device: &DeviceId) -> Result<Vec<RawInterface>, FetchError>;
}

#[async_trait]
impl<F: InterfaceFetcher + ?Sized> InterfaceFetcher for Arc<F> {
    async fn fetch_interfaces(&self, device: &DeviceId) -> Result<Vec<RawInterface>, FetchError> {
        (**self).fetch_interfaces(device).await
    }
}

/// Errors a fetcher can report for one device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),
    #[error("device {0} not found in inventory")]
    UnknownDevice(DeviceId),
    /// The device answered but does not expose the requested capability at all.
    #[error("feature {feature} not available: {message}")]
    FeatureNotConfigured { feature: String, message: String },
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport(_) => FetchErrorKind::Transport,
            FetchError::Auth(_) => FetchErrorKind::Auth,
            FetchError::Timeout(_) => FetchErrorKind::Timeout,
            FetchError::UnknownDevice(_) => FetchErrorKind::UnknownDevice,
            FetchError::FeatureNotConfigured { .. } => FetchErrorKind::FeatureNotConfigured,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchErrorKind {
    Transport,
    Auth,
    Timeout,
    UnknownDevice,
    FeatureNotConfigured,
    /// The fetch task died before producing a result.
    Panicked,
    /// The fetch task was cancelled before producing a result.
    Cancelled,
}

/// Errors listing the inventory.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no inventory file specified; pass a path or set NETWORK_INVENTORY")]
    MissingPath,
    #[error("failed to read inventory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse inventory {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate device in inventory: {0}")]
    DuplicateDevice(DeviceId),
}
