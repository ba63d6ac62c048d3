/*!
IP topology discovery.

Every inventoried device is asked for its interface addresses in parallel; devices sharing an
IP subnet pairwise are linked, and the resulting graph answers neighbor, shortest-path and
segment queries.
*/

pub mod acquisition;
pub mod config;
pub mod network;
pub mod topology;

pub use network::device::DeviceId;
pub use topology::{TopologyBuildResult, TopologyError, TopologyService};
