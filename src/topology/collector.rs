/*!
Parallel interface collection.

`ParallelCollector` runs one fetch per device on the tokio runtime, with at most `max_workers`
fetches in flight (a semaphore gates the rest). Results are joined back in the order the devices
were submitted, never in completion order, since link direction depends on device order.

Each device ends up with exactly one `CollectionOutcome`. A failing device never aborts its
siblings unless fail-fast is enabled, in which case the first error cancels every pending and
in-flight fetch and the whole run is reported as `CollectionAborted`.
*/

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    acquisition::core::{FetchError, FetchErrorKind, InterfaceFetcher},
    network::device::{DeviceId, InterfaceRecord, RawInterface, normalize_interfaces},
    topology::error::{CollectionAborted, CollectionError},
};

pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Per-device result of one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// The device answered. An empty list is a legitimate, unaddressed device.
    Success(Vec<InterfaceRecord>),
    /// The device does not expose the interface feature at all.
    FeatureAbsent { feature: String, message: String },
    /// The device could not be queried.
    Error(CollectionError),
}

impl CollectionOutcome {
    pub fn from_fetch(device: &DeviceId, result: Result<Vec<RawInterface>, FetchError>) -> Self {
        match result {
            Ok(raw) => CollectionOutcome::Success(normalize_interfaces(device, &raw)),
            Err(FetchError::FeatureNotConfigured { feature, message }) => {
                CollectionOutcome::FeatureAbsent { feature, message }
            }
            Err(e) => CollectionOutcome::Error(CollectionError::from_fetch(device, &e)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CollectionOutcome::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CollectionOutcome::Error(_))
    }

    pub fn interfaces(&self) -> &[InterfaceRecord] {
        match self {
            CollectionOutcome::Success(records) => records,
            _ => &[],
        }
    }
}

/// Outcomes of a complete collection run, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    outcomes: Vec<(DeviceId, CollectionOutcome)>,
    error_devices: Vec<DeviceId>,
    first_error: Option<CollectionError>,
}

impl CollectionReport {
    /// Assembles a report from ordered outcomes, deriving the error bookkeeping.
    pub fn new(outcomes: Vec<(DeviceId, CollectionOutcome)>) -> Self {
        let mut error_devices = Vec::new();
        let mut first_error = None;
        for (device, outcome) in &outcomes {
            if let CollectionOutcome::Error(e) = outcome {
                error_devices.push(device.clone());
                first_error.get_or_insert_with(|| e.clone());
            }
        }
        Self {
            outcomes,
            error_devices,
            first_error,
        }
    }

    pub fn outcomes(&self) -> &[(DeviceId, CollectionOutcome)] {
        &self.outcomes
    }

    pub fn get(&self, device: &DeviceId) -> Option<&CollectionOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == device)
            .map(|(_, outcome)| outcome)
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.outcomes.iter().map(|(device, _)| device)
    }

    /// Successfully collected devices in submission order.
    pub fn successful_devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_success())
            .map(|(device, _)| device)
    }

    pub fn feature_absent_devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, CollectionOutcome::FeatureAbsent { .. }))
            .map(|(device, _)| device)
    }

    pub fn total_devices(&self) -> usize {
        self.outcomes.len()
    }

    pub fn error_devices(&self) -> &[DeviceId] {
        &self.error_devices
    }

    pub fn first_error(&self) -> Option<&CollectionError> {
        self.first_error.as_ref()
    }

    pub fn has_errors(&self) -> bool {
        !self.error_devices.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParallelCollector {
    max_workers: usize,
    fail_fast: bool,
}

impl Default for ParallelCollector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl ParallelCollector {
    /// A worker count of zero is treated as one.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            fail_fast: false,
        }
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Collects every device and blocks until all fetches have finished.
    pub async fn collect<F>(
        &self,
        devices: &[DeviceId],
        fetcher: Arc<F>,
    ) -> Result<CollectionReport, CollectionAborted>
    where
        F: InterfaceFetcher + ?Sized + 'static,
    {
        debug!(
            devices = devices.len(),
            max_workers = self.max_workers,
            fail_fast = self.fail_fast,
            "starting interface collection"
        );
        let limit = Arc::new(Semaphore::new(self.max_workers));
        let cancel = CancellationToken::new();

        let handles: Vec<_> = devices
            .iter()
            .map(|device| {
                let device = device.clone();
                let fetcher = fetcher.clone();
                let limit = limit.clone();
                let cancel = cancel.clone();
                let fail_fast = self.fail_fast;
                tokio::spawn(async move {
                    // hold the permit until the fetch completes
                    let _permit = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return None,
                        permit = limit.acquire_owned() => permit.ok()?,
                    };
                    // a panicking fetcher surfaces here as a JoinError, so it can cancel too
                    let fetch = {
                        let device = device.clone();
                        tokio::spawn(async move { fetcher.fetch_interfaces(&device).await })
                    };
                    let abort = fetch.abort_handle();
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            abort.abort();
                            return None;
                        }
                        joined = fetch => match joined {
                            Ok(result) => CollectionOutcome::from_fetch(&device, result),
                            Err(join_error) => CollectionOutcome::Error(CollectionError::new(
                                device.clone(),
                                FetchErrorKind::Panicked,
                                format!("fetch task failed: {join_error}"),
                            )),
                        },
                    };
                    if fail_fast && outcome.is_error() {
                        cancel.cancel();
                    }
                    Some(outcome)
                })
            })
            .collect();

        // Join barrier, in submission order.
        let mut joined = Vec::with_capacity(handles.len());
        for (device, handle) in devices.iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => Some(CollectionOutcome::Error(CollectionError::new(
                    device.clone(),
                    FetchErrorKind::Panicked,
                    format!("fetch task failed: {join_error}"),
                ))),
            };
            match &outcome {
                Some(CollectionOutcome::Success(records)) => {
                    debug!(device = %device, interfaces = records.len(), "collected interfaces");
                }
                Some(CollectionOutcome::FeatureAbsent { feature, .. }) => {
                    debug!(device = %device, feature = %feature, "interface feature not available");
                }
                Some(CollectionOutcome::Error(e)) => {
                    warn!(device = %device, kind = ?e.kind, error = %e.message, "interface collection failed");
                    if self.fail_fast {
                        cancel.cancel();
                    }
                }
                None => {}
            }
            joined.push((device.clone(), outcome));
        }

        if self.fail_fast && cancel.is_cancelled() {
            let completed = CollectionReport::new(
                joined
                    .iter()
                    .filter_map(|(device, outcome)| Some((device.clone(), outcome.clone()?)))
                    .collect(),
            );
            if let Some(first_error) = completed.first_error().cloned() {
                warn!(device = %first_error.device, "fail-fast: aborting collection");
                return Err(CollectionAborted {
                    first_error,
                    error_devices: completed.error_devices().to_vec(),
                    total_devices: devices.len(),
                });
            }
        }

        let report = CollectionReport::new(
            joined
                .into_iter()
                .map(|(device, outcome)| {
                    let outcome = outcome.unwrap_or_else(|| {
                        CollectionOutcome::Error(CollectionError::new(
                            device.clone(),
                            FetchErrorKind::Cancelled,
                            "fetch task cancelled",
                        ))
                    });
                    (device, outcome)
                })
                .collect(),
        );
        info!(
            devices = report.total_devices(),
            errors = report.error_devices().len(),
            "interface collection complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct ScriptedFetcher {
        script: HashMap<DeviceId, (Duration, Result<Vec<RawInterface>, FetchError>)>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        started: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn respond(
            mut self,
            device: &str,
            delay_ms: u64,
            result: Result<Vec<RawInterface>, FetchError>,
        ) -> Self {
            self.script
                .insert(DeviceId::from(device), (Duration::from_millis(delay_ms), result));
            self
        }
    }

    #[async_trait]
    impl InterfaceFetcher for ScriptedFetcher {
        async fn fetch_interfaces(&self, device: &DeviceId) -> Result<Vec<RawInterface>, FetchError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let (delay, result) = self
                .script
                .get(device)
                .cloned()
                .unwrap_or((Duration::ZERO, Err(FetchError::UnknownDevice(device.clone()))));
            if device.as_str() == "panics" {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                panic!("fetcher bug");
            }
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn ids(names: &[&str]) -> Vec<DeviceId> {
        names.iter().map(|n| DeviceId::from(*n)).collect()
    }

    fn iface(addr: &str) -> Result<Vec<RawInterface>, FetchError> {
        Ok(vec![RawInterface::new("eth0", addr)])
    }

    #[tokio::test]
    async fn outcomes_follow_submission_order() {
        let fetcher = ScriptedFetcher::default()
            .respond("A", 60, iface("10.0.0.1/30"))
            .respond("B", 30, iface("10.0.0.2/30"))
            .respond("C", 0, Ok(vec![]));
        let report = ParallelCollector::new(3)
            .collect(&ids(&["A", "B", "C"]), Arc::new(fetcher))
            .await
            .unwrap();

        let order: Vec<&str> = report.devices().map(DeviceId::as_str).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert_eq!(report.total_devices(), 3);
        assert!(!report.has_errors());
        assert_eq!(report.get(&DeviceId::from("C")), Some(&CollectionOutcome::Success(vec![])));
    }

    #[tokio::test]
    async fn worker_count_bounds_concurrency() {
        let names: Vec<String> = (0..8).map(|i| format!("R{i}")).collect();
        let fetcher = names
            .iter()
            .fold(ScriptedFetcher::default(), |f, name| f.respond(name, 20, Ok(vec![])));
        let fetcher = Arc::new(fetcher);
        let devices: Vec<DeviceId> = names.iter().map(|n| DeviceId::from(n.as_str())).collect();

        let report = ParallelCollector::new(2)
            .collect(&devices, fetcher.clone())
            .await
            .unwrap();
        assert_eq!(report.total_devices(), 8);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn zero_workers_still_collects() {
        let fetcher = ScriptedFetcher::default().respond("A", 0, Ok(vec![]));
        let collector = ParallelCollector::new(0);
        assert_eq!(collector.max_workers(), 1);
        let report = collector.collect(&ids(&["A"]), Arc::new(fetcher)).await.unwrap();
        assert_eq!(report.successful_devices().count(), 1);
    }

    #[tokio::test]
    async fn failures_are_isolated_and_first_error_is_by_submission_order() {
        let fetcher = ScriptedFetcher::default()
            .respond("A", 0, iface("10.0.0.1/30"))
            .respond("D", 50, Err(FetchError::Transport("connection refused".into())))
            .respond("E", 0, Err(FetchError::Auth("bad credentials".into())))
            .respond("B", 0, iface("10.0.0.2/30"));
        let report = ParallelCollector::new(4)
            .collect(&ids(&["A", "D", "E", "B"]), Arc::new(fetcher))
            .await
            .unwrap();

        assert_eq!(report.error_devices(), &ids(&["D", "E"])[..]);
        let first = report.first_error().unwrap();
        assert_eq!(first.device, DeviceId::from("D"));
        assert_eq!(first.kind, FetchErrorKind::Transport);
        assert_eq!(report.successful_devices().count(), 2);
    }

    #[tokio::test]
    async fn feature_absence_is_not_an_error() {
        let fetcher = ScriptedFetcher::default().respond(
            "A",
            0,
            Err(FetchError::FeatureNotConfigured {
                feature: "interfaces".into(),
                message: "not supported".into(),
            }),
        );
        let report = ParallelCollector::default()
            .collect(&ids(&["A"]), Arc::new(fetcher))
            .await
            .unwrap();
        assert!(!report.has_errors());
        assert_eq!(report.feature_absent_devices().count(), 1);
        assert_eq!(report.successful_devices().count(), 0);
    }

    #[tokio::test]
    async fn panicking_fetch_only_fails_its_device() {
        let fetcher = ScriptedFetcher::default().respond("A", 0, Ok(vec![]));
        let report = ParallelCollector::default()
            .collect(&ids(&["panics", "A"]), Arc::new(fetcher))
            .await
            .unwrap();
        assert_eq!(report.error_devices(), &ids(&["panics"])[..]);
        assert_eq!(report.first_error().unwrap().kind, FetchErrorKind::Panicked);
        assert!(report.get(&DeviceId::from("A")).unwrap().is_success());
    }

    #[tokio::test]
    async fn fail_fast_cancels_outstanding_fetches() {
        let fetcher = ScriptedFetcher::default()
            .respond("A", 10_000, iface("10.0.0.1/30"))
            .respond("D", 0, Err(FetchError::Transport("unreachable".into())))
            .respond("B", 10_000, iface("10.0.0.2/30"))
            .respond("C", 10_000, Ok(vec![]));
        let fetcher = Arc::new(fetcher);
        let collector = ParallelCollector::new(2).with_fail_fast(true);

        let aborted = tokio::time::timeout(
            Duration::from_secs(5),
            collector.collect(&ids(&["A", "D", "B", "C"]), fetcher.clone()),
        )
        .await
        .expect("fail-fast must not wait for slow devices")
        .unwrap_err();

        assert_eq!(aborted.first_error.device, DeviceId::from("D"));
        assert_eq!(aborted.error_devices, ids(&["D"]));
        assert_eq!(aborted.total_devices, 4);
        // B and C never got a worker
        assert!(fetcher.started.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn fail_fast_aborts_promptly_on_a_panicking_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::default().respond("slow", 10_000, Ok(vec![])));
        let collector = ParallelCollector::new(2).with_fail_fast(true);

        let aborted = tokio::time::timeout(
            Duration::from_secs(5),
            collector.collect(&ids(&["slow", "panics"]), fetcher),
        )
        .await
        .expect("a panicking fetch must cancel the slow one")
        .unwrap_err();

        assert_eq!(aborted.first_error.device, DeviceId::from("panics"));
        assert_eq!(aborted.first_error.kind, FetchErrorKind::Panicked);
        assert_eq!(aborted.error_devices, ids(&["panics"]));
    }

    #[tokio::test]
    async fn fail_fast_without_errors_is_a_normal_run() {
        let fetcher = ScriptedFetcher::default()
            .respond("A", 0, Ok(vec![]))
            .respond("B", 0, Ok(vec![]));
        let report = ParallelCollector::new(1)
            .with_fail_fast(true)
            .collect(&ids(&["A", "B"]), Arc::new(fetcher))
            .await
            .unwrap();
        assert_eq!(report.successful_devices().count(), 2);
    }

    #[tokio::test]
    async fn empty_device_list_yields_empty_report() {
        let report = ParallelCollector::default()
            .collect(&[], Arc::new(ScriptedFetcher::default()))
            .await
            .unwrap();
        assert_eq!(report.total_devices(), 0);
        assert!(report.first_error().is_none());
    }
}
