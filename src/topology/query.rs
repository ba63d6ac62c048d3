/*!
Read-only queries over a built topology graph.

Nothing here fails on absence: an unknown device, a missing path or an unused network are all
ordinary results, kept distinct from each other (`NotInTopology` vs `Isolated`, `NotFound` vs a
one-node path).
*/

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use ipnetwork::IpNetwork;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::network::{
    device::{DeviceId, parse_cidr},
    link::Link,
    topology_graph::TopologyGraph,
};

/// A directly connected device and the link that connects it, seen from the queried device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbor {
    pub neighbor: DeviceId,
    pub local_interface: String,
    pub remote_interface: String,
    pub link: Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeighborsResult {
    /// The device was not collected into this topology.
    NotInTopology,
    /// The device is a node with no links.
    Isolated,
    Neighbors(Vec<Neighbor>),
}

impl NeighborsResult {
    pub fn in_topology(&self) -> bool {
        !matches!(self, NeighborsResult::NotInTopology)
    }

    pub fn is_isolated(&self) -> bool {
        matches!(self, NeighborsResult::Isolated)
    }

    pub fn neighbors(&self) -> &[Neighbor] {
        match self {
            NeighborsResult::Neighbors(neighbors) => neighbors,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Path {
    pub nodes: Vec<DeviceId>,
    pub edges: Vec<Link>,
}

impl Path {
    pub fn hop_count(&self) -> usize {
        self.edges.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResult {
    Found(Path),
    /// Source or target is not a node, or they are in different components.
    NotFound,
}

impl PathResult {
    pub fn is_found(&self) -> bool {
        matches!(self, PathResult::Found(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            PathResult::Found(path) => Some(path),
            PathResult::NotFound => None,
        }
    }
}

/// One entry of the adjacency listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection<'a> {
    pub source: &'a DeviceId,
    pub target: &'a DeviceId,
    pub attributes: &'a Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub links: usize,
    pub isolated_nodes: usize,
    pub components: usize,
}

pub struct GraphQueryService<'g> {
    graph: &'g TopologyGraph,
}

impl<'g> GraphQueryService<'g> {
    pub fn new(graph: &'g TopologyGraph) -> Self {
        Self { graph }
    }

    /// All links incident on `device`, each with the opposite endpoint. A self-loop is listed
    /// once, with the device as its own neighbor.
    pub fn neighbors(&self, device: &DeviceId) -> NeighborsResult {
        let Some(links) = self.graph.incident_links(device) else {
            return NeighborsResult::NotInTopology;
        };
        if links.is_empty() {
            return NeighborsResult::Isolated;
        }
        NeighborsResult::Neighbors(
            links
                .into_iter()
                .filter_map(|link| {
                    let end = link.oriented_from(device)?;
                    Some(Neighbor {
                        neighbor: end.remote.clone(),
                        local_interface: end.local_interface.to_string(),
                        remote_interface: end.remote_interface.to_string(),
                        link: link.clone(),
                    })
                })
                .collect(),
        )
    }

    /// Unweighted breadth-first shortest path. Ties go to the neighbor reached through the
    /// earliest-inserted link.
    pub fn shortest_path(&self, source: &DeviceId, target: &DeviceId) -> PathResult {
        let (Some(start), Some(goal)) = (self.graph.index_of(source), self.graph.index_of(target))
        else {
            return PathResult::NotFound;
        };
        if start == goal {
            return PathResult::Found(Path {
                nodes: vec![source.clone()],
                edges: Vec::new(),
            });
        }

        let mut previous: HashMap<NodeIndex, (NodeIndex, &Link)> = HashMap::new();
        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        'search: while let Some(current) = queue.pop_front() {
            for (next, link) in self.graph.adjacent(current) {
                if !visited.insert(next) {
                    continue;
                }
                previous.insert(next, (current, link));
                if next == goal {
                    break 'search;
                }
                queue.push_back(next);
            }
        }

        if !previous.contains_key(&goal) {
            return PathResult::NotFound;
        }
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut cursor = goal;
        while let Some(&(prior, link)) = previous.get(&cursor) {
            nodes.push(cursor);
            edges.push(link.clone());
            cursor = prior;
        }
        nodes.push(start);
        nodes.reverse();
        edges.reverse();

        let nodes: Option<Vec<DeviceId>> = nodes
            .into_iter()
            .map(|index| self.graph.device_at(index).cloned())
            .collect();
        match nodes {
            Some(nodes) => PathResult::Found(Path { nodes, edges }),
            None => PathResult::NotFound,
        }
    }

    /// Devices on any link tagged with `network`. The query is normalized first, so
    /// `10.0.0.1/30` and `10.0.0.1/255.255.255.252` both find `10.0.0.0/30`; an unparsable
    /// network matches nothing.
    pub fn segment(&self, network: &str) -> BTreeSet<DeviceId> {
        parse_cidr(network)
            .map(|(_, network)| self.segment_network(network))
            .unwrap_or_default()
    }

    pub fn segment_network(&self, network: IpNetwork) -> BTreeSet<DeviceId> {
        self.graph
            .links()
            .filter(|link| link.network == network)
            .flat_map(|link| [link.a.clone(), link.b.clone()])
            .collect()
    }

    /// Every link as a source/target connection, in inference order.
    pub fn adjacency(&self) -> Vec<Connection<'g>> {
        self.graph
            .links()
            .map(|link| Connection {
                source: &link.a,
                target: &link.b,
                attributes: link,
            })
            .collect()
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.graph.node_count(),
            links: self.graph.link_count(),
            isolated_nodes: self.graph.isolated_count(),
            components: self.graph.component_count(),
        }
    }
}
