/*
 * This module defines the protocol-agnostic topology data model:
 * devices and their addressed interfaces, inferred links, and the graph snapshot built from them.
 */

pub mod device;
pub mod link;
pub mod topology_graph;
