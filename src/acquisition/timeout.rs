use std::time::Duration;

use async_trait::async_trait;

use crate::{
    acquisition::core::{FetchError, InterfaceFetcher},
    network::device::{DeviceId, RawInterface},
};

/// Wraps a fetcher so that every call is bounded by `timeout`; an elapsed call becomes
/// `FetchError::Timeout` like any other per-device failure.
pub struct TimeoutFetcher<F> {
    inner: F,
    timeout: Duration,
}

impl<F> TimeoutFetcher<F> {
    pub fn new(inner: F, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<F: InterfaceFetcher> InterfaceFetcher for TimeoutFetcher<F> {
    async fn fetch_interfaces(&self, device: &DeviceId) -> Result<Vec<RawInterface>, FetchError> {
        tokio::time::timeout(self.timeout, self.inner.fetch_interfaces(device))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }
}
