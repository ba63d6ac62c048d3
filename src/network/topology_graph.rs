use std::collections::HashMap;

use petgraph::{
    algo::connected_components,
    graph::{EdgeIndex, NodeIndex, UnGraph},
    visit::EdgeRef,
};
use tracing::warn;

use crate::network::{device::DeviceId, link::Link};

/// Immutable snapshot of the inferred topology.
///
/// Nodes are devices, edges are inferred links. `node_id_to_index_map` maps device ids to
/// graph indices so lookups never panic on unknown devices.
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    graph: UnGraph<DeviceId, Link>,
    node_id_to_index_map: HashMap<DeviceId, NodeIndex>,
}

impl TopologyGraph {
    /// Build a graph from a node list and a link list.
    /// Nodes keep their first-seen order; duplicates are ignored. Links are inserted in order and
    /// links referencing a device that is not a node are skipped.
    pub fn build_new(nodes: impl IntoIterator<Item = DeviceId>, links: Vec<Link>) -> Self {
        let mut graph = UnGraph::default();
        let mut node_id_to_index_map = HashMap::new();
        for node in nodes {
            if node_id_to_index_map.contains_key(&node) {
                continue;
            }
            let index = graph.add_node(node.clone());
            node_id_to_index_map.insert(node, index);
        }

        for link in links {
            match (
                node_id_to_index_map.get(&link.a),
                node_id_to_index_map.get(&link.b),
            ) {
                (Some(&a), Some(&b)) => {
                    graph.add_edge(a, b, link);
                }
                _ => {
                    warn!(a = %link.a, b = %link.b, network = %link.network, "skipping link with an endpoint outside the topology");
                }
            }
        }

        Self {
            graph,
            node_id_to_index_map,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, device: &DeviceId) -> bool {
        self.node_id_to_index_map.contains_key(device)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Devices in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &DeviceId> {
        self.graph.node_weights()
    }

    /// Links in insertion order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.graph.edge_weights()
    }

    /// Links incident on `device` in insertion order, or `None` when the device is not a node.
    /// A self-loop is reported once.
    pub fn incident_links(&self, device: &DeviceId) -> Option<Vec<&Link>> {
        let index = *self.node_id_to_index_map.get(device)?;
        Some(
            self.incident_edges(index)
                .into_iter()
                .map(|edge| &self.graph[edge])
                .collect(),
        )
    }

    /// Neighbors of the node at `index` in link insertion order, each paired with the connecting link.
    pub(crate) fn adjacent(&self, index: NodeIndex) -> Vec<(NodeIndex, &Link)> {
        self.incident_edges(index)
            .into_iter()
            .filter_map(|edge| {
                let (a, b) = self.graph.edge_endpoints(edge)?;
                let other = if a == index { b } else { a };
                Some((other, &self.graph[edge]))
            })
            .collect()
    }

    pub(crate) fn index_of(&self, device: &DeviceId) -> Option<NodeIndex> {
        self.node_id_to_index_map.get(device).copied()
    }

    pub(crate) fn device_at(&self, index: NodeIndex) -> Option<&DeviceId> {
        self.graph.node_weight(index)
    }

    /// Number of nodes without any incident link.
    pub fn isolated_count(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&index| self.graph.edges(index).next().is_none())
            .count()
    }

    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    // petgraph walks adjacency lists newest-first; sort to get construction order back.
    fn incident_edges(&self, index: NodeIndex) -> Vec<EdgeIndex> {
        let mut edges: Vec<EdgeIndex> = self.graph.edges(index).map(|edge| edge.id()).collect();
        edges.sort();
        edges.dedup();
        edges
    }
}
