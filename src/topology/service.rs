/*!
Caller-facing entry points.

`TopologyService` builds a fresh `TopologyBuildResult` on every call; nothing is cached. Queries
take the build result explicitly, so rebuilding or reusing one is the caller's decision.

The query functions return `Err(TopologyError::BuildFailed)` when handed an aborted build, and
`Ok` with an empty/absent answer when the topology is fine but the query found nothing.
*/

use std::{collections::BTreeSet, sync::Arc};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    acquisition::{
        core::{DeviceRegistry, InterfaceFetcher},
        timeout::TimeoutFetcher,
    },
    config::TopologyConfig,
    network::device::DeviceId,
    topology::{
        builder::{BuildStatus, TopologyBuildResult},
        collector::ParallelCollector,
        error::{TopologyError, TopologyResult},
        query::{Connection, GraphQueryService, GraphSummary, NeighborsResult, PathResult},
    },
};

pub struct TopologyService {
    registry: Arc<dyn DeviceRegistry>,
    fetcher: Arc<dyn InterfaceFetcher>,
    config: TopologyConfig,
}

impl TopologyService {
    pub fn new(
        registry: impl DeviceRegistry + 'static,
        fetcher: impl InterfaceFetcher + 'static,
        config: TopologyConfig,
    ) -> Self {
        Self::from_shared(Arc::new(registry), Arc::new(fetcher), config)
    }

    pub fn from_shared(
        registry: Arc<dyn DeviceRegistry>,
        fetcher: Arc<dyn InterfaceFetcher>,
        config: TopologyConfig,
    ) -> Self {
        Self {
            registry,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Builds the topology with the configured worker count.
    pub async fn build(&self) -> TopologyResult<TopologyBuildResult> {
        self.build_topology(self.config.max_workers).await
    }

    /// Surveys every inventoried device with at most `max_workers` concurrent fetches and builds
    /// the topology. Only a registry failure is an `Err`; device failures are reported inside the
    /// result (or make it `Failed` under fail-fast).
    pub async fn build_topology(&self, max_workers: usize) -> TopologyResult<TopologyBuildResult> {
        let devices = self.registry.list_devices().await?;
        info!(devices = devices.len(), "building topology");

        let fetcher: Arc<dyn InterfaceFetcher> = match self.config.fetch_timeout {
            Some(timeout) => Arc::new(TimeoutFetcher::new(self.fetcher.clone(), timeout)),
            None => self.fetcher.clone(),
        };
        let collector = ParallelCollector::new(max_workers).with_fail_fast(self.config.fail_fast);

        let builder = self.config.builder();
        match collector.collect(&devices, fetcher).await {
            Ok(report) => {
                let links = self.config.inferencer().infer(&report);
                Ok(builder.build(&devices, &report, links))
            }
            Err(aborted) => Ok(builder.failed(aborted)),
        }
    }
}

fn ensure_built(result: &TopologyBuildResult) -> TopologyResult<GraphQueryService<'_>> {
    match result.failure() {
        Some(error) => {
            warn!(error = %error, "query on a failed topology build");
            Err(TopologyError::BuildFailed(error.clone()))
        }
        None => Ok(GraphQueryService::new(result.graph())),
    }
}

pub fn neighbors(result: &TopologyBuildResult, device: &DeviceId) -> TopologyResult<NeighborsResult> {
    let found = ensure_built(result)?.neighbors(device);
    match &found {
        NeighborsResult::NotInTopology => {
            warn!(device = %device, "device not found in topology, check interface collection");
        }
        NeighborsResult::Isolated => {
            warn!(device = %device, "device has no neighbors, device may be isolated");
        }
        NeighborsResult::Neighbors(list) => {
            debug!(device = %device, neighbors = list.len(), "found neighbors");
        }
    }
    Ok(found)
}

pub fn shortest_path(
    result: &TopologyBuildResult,
    source: &DeviceId,
    target: &DeviceId,
) -> TopologyResult<PathResult> {
    let path = ensure_built(result)?.shortest_path(source, target);
    if !path.is_found() {
        debug!(source = %source, target = %target, "no path");
    }
    Ok(path)
}

pub fn segment(result: &TopologyBuildResult, network: &str) -> TopologyResult<BTreeSet<DeviceId>> {
    Ok(ensure_built(result)?.segment(network))
}

/// Every inferred link as a source/target connection.
pub fn adjacency(result: &TopologyBuildResult) -> TopologyResult<Vec<Connection<'_>>> {
    Ok(ensure_built(result)?.adjacency())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TopologySummary {
    pub status: BuildStatus,
    pub total_devices: usize,
    pub error_devices: usize,
    pub possibly_incomplete: bool,
    pub graph: GraphSummary,
}

pub fn summary(result: &TopologyBuildResult) -> TopologySummary {
    TopologySummary {
        status: result.status(),
        total_devices: result.total_devices(),
        error_devices: result.error_devices().len(),
        possibly_incomplete: result.possibly_incomplete(),
        graph: GraphQueryService::new(result.graph()).summary(),
    }
}
