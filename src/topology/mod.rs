/*!
Topology module

This module turns per-device interface state into a queryable topology.

Structure:
- `collector`: bounded parallel collection of every device (`ParallelCollector`), one
               `CollectionOutcome` per device, fail-fast cancellation.
- `inference`: subnet grouping and point-to-point link inference (`SubnetLinkInferencer`).
- `builder`: graph assembly and failure summary (`TopologyGraphBuilder`, `TopologyBuildResult`).
- `query`: read-only graph queries (`GraphQueryService`).
- `service`: the caller-facing facade (`TopologyService` plus the query functions).
- `error`: collection and topology error types.

Re-exports:
- `TopologyService`, `TopologyBuildResult`, `TopologyError` and the query functions for easy
  consumption by callers.
*/

pub mod builder;
pub mod collector;
pub mod error;
pub mod inference;
pub mod query;
pub mod service;

pub use builder::{BuildStatus, TopologyBuildResult};
pub use error::{TopologyError, TopologyResult};
pub use service::{TopologyService, adjacency, neighbors, segment, shortest_path, summary};
