use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    acquisition::core::{FetchError, FetchErrorKind, RegistryError},
    network::device::DeviceId,
};

/// A device that could not be surveyed, as recorded in the collection report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{device}: {message}")]
pub struct CollectionError {
    pub device: DeviceId,
    pub kind: FetchErrorKind,
    pub message: String,
}

impl CollectionError {
    pub fn new(device: DeviceId, kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            device,
            kind,
            message: message.into(),
        }
    }

    pub fn from_fetch(device: &DeviceId, error: &FetchError) -> Self {
        Self::new(device.clone(), error.kind(), error.to_string())
    }
}

/// Fail-fast abort of a collection run. Completed results are discarded; only the failure
/// bookkeeping survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("collection aborted after {} of {total_devices} devices failed, first: {first_error}", error_devices.len())]
pub struct CollectionAborted {
    pub first_error: CollectionError,
    pub error_devices: Vec<DeviceId>,
    pub total_devices: usize,
}

/// Facade-level failures: the topology could not be built, or a query was handed a failed build.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("device registry unavailable: {0}")]
    Registry(#[from] RegistryError),
    #[error("topology build failed: {0}")]
    BuildFailed(CollectionError),
}

pub type TopologyResult<T> = Result<T, TopologyError>;
