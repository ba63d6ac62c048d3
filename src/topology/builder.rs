use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    network::{device::DeviceId, link::Link, topology_graph::TopologyGraph},
    topology::{
        collector::{CollectionOutcome, CollectionReport},
        error::{CollectionAborted, CollectionError},
    },
};

pub const DEFAULT_INCOMPLETE_ERROR_RATIO: f64 = 0.25;

/// How a topology build ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    /// Every device was collected (feature-absent devices included).
    Complete,
    /// Some devices failed; the graph holds everything else.
    Degraded,
    /// Fail-fast aborted the build; the graph is empty.
    Failed,
}

/// One immutable topology build: the graph plus its failure summary.
#[derive(Debug, Clone)]
pub struct TopologyBuildResult {
    graph: TopologyGraph,
    status: BuildStatus,
    error_devices: Vec<DeviceId>,
    total_devices: usize,
    first_error: Option<CollectionError>,
    possibly_incomplete: bool,
}

impl TopologyBuildResult {
    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    pub fn status(&self) -> BuildStatus {
        self.status
    }

    pub fn is_failed(&self) -> bool {
        self.status == BuildStatus::Failed
    }

    pub fn has_errors(&self) -> bool {
        !self.error_devices.is_empty()
    }

    pub fn error_devices(&self) -> &[DeviceId] {
        &self.error_devices
    }

    pub fn total_devices(&self) -> usize {
        self.total_devices
    }

    pub fn first_error(&self) -> Option<&CollectionError> {
        self.first_error.as_ref()
    }

    /// The error that aborted the build, if it was aborted.
    pub fn failure(&self) -> Option<&CollectionError> {
        match self.status {
            BuildStatus::Failed => self.first_error.as_ref(),
            _ => None,
        }
    }

    /// Advisory only: set when the error ratio reached the builder's threshold.
    pub fn possibly_incomplete(&self) -> bool {
        self.possibly_incomplete
    }

    pub fn error_ratio(&self) -> f64 {
        if self.total_devices == 0 {
            0.0
        } else {
            self.error_devices.len() as f64 / self.total_devices as f64
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TopologyGraphBuilder {
    incomplete_error_ratio: f64,
}

impl Default for TopologyGraphBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_INCOMPLETE_ERROR_RATIO)
    }
}

impl TopologyGraphBuilder {
    pub fn new(incomplete_error_ratio: f64) -> Self {
        Self {
            incomplete_error_ratio,
        }
    }

    /// Builds the topology from a completed collection. Every successfully collected device in
    /// `device_list` becomes a node, linked or not.
    pub fn build(
        &self,
        device_list: &[DeviceId],
        report: &CollectionReport,
        links: Vec<Link>,
    ) -> TopologyBuildResult {
        let outcomes: HashMap<&DeviceId, &CollectionOutcome> = report
            .outcomes()
            .iter()
            .map(|(device, outcome)| (device, outcome))
            .collect();
        let nodes = device_list
            .iter()
            .filter(|device| outcomes.get(device).is_some_and(|o| o.is_success()))
            .cloned();
        let graph = TopologyGraph::build_new(nodes, links);

        let error_devices = report.error_devices().to_vec();
        let total_devices = report.total_devices();
        let status = if error_devices.is_empty() {
            BuildStatus::Complete
        } else {
            BuildStatus::Degraded
        };
        let mut result = TopologyBuildResult {
            graph,
            status,
            error_devices,
            total_devices,
            first_error: report.first_error().cloned(),
            possibly_incomplete: false,
        };

        info!(
            nodes = result.graph.node_count(),
            links = result.graph.link_count(),
            errors = result.error_devices.len(),
            total = total_devices,
            "built topology"
        );
        if total_devices > 0 && result.error_ratio() >= self.incomplete_error_ratio {
            result.possibly_incomplete = true;
            warn!(
                errors = result.error_devices.len(),
                total = total_devices,
                "topology may be materially incomplete"
            );
        }
        let nodes = result.graph.node_count();
        if nodes > 0 && result.graph.link_count() < nodes {
            warn!(
                nodes,
                links = result.graph.link_count(),
                "sparse topology: fewer links than devices, check device connectivity"
            );
        }
        result
    }

    /// The result of a fail-fast abort: empty graph, failure bookkeeping only.
    pub fn failed(&self, aborted: CollectionAborted) -> TopologyBuildResult {
        warn!(error = %aborted.first_error, "topology build failed");
        TopologyBuildResult {
            graph: TopologyGraph::empty(),
            status: BuildStatus::Failed,
            error_devices: aborted.error_devices,
            total_devices: aborted.total_devices,
            first_error: Some(aborted.first_error),
            possibly_incomplete: true,
        }
    }
}
