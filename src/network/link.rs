use std::{fmt::Display, net::IpAddr};

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::network::device::{DeviceId, InterfaceRecord};

/// An inferred point-to-point link between two devices sharing a subnet.
///
/// Undirected, but `a`/`b` are ordered: `a` is the endpoint whose device came first in the
/// device list the topology was collected from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub a: DeviceId,
    pub b: DeviceId,
    pub network: IpNetwork,
    pub interface_a: String,
    pub interface_b: String,
    pub ip_a: IpAddr,
    pub ip_b: IpAddr,
}

impl Link {
    /// Builds a link from its source and target endpoint records.
    pub fn between(source: &InterfaceRecord, target: &InterfaceRecord) -> Self {
        Self {
            a: source.device.clone(),
            b: target.device.clone(),
            network: source.network,
            interface_a: source.interface.clone(),
            interface_b: target.interface.clone(),
            ip_a: source.ip,
            ip_b: target.ip,
        }
    }

    pub fn touches(&self, device: &DeviceId) -> bool {
        self.a == *device || self.b == *device
    }

    pub fn is_self_loop(&self) -> bool {
        self.a == self.b
    }

    /// Local/remote view of the link as seen from `device`.
    pub fn oriented_from(&self, device: &DeviceId) -> Option<LinkEnd<'_>> {
        if self.a == *device {
            Some(LinkEnd {
                local_interface: &self.interface_a,
                local_ip: self.ip_a,
                remote: &self.b,
                remote_interface: &self.interface_b,
                remote_ip: self.ip_b,
            })
        } else if self.b == *device {
            Some(LinkEnd {
                local_interface: &self.interface_b,
                local_ip: self.ip_b,
                remote: &self.a,
                remote_interface: &self.interface_a,
                remote_ip: self.ip_a,
            })
        } else {
            None
        }
    }
}

impl Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({}) <-> {} {} ({}) on {}",
            self.a, self.interface_a, self.ip_a, self.b, self.interface_b, self.ip_b, self.network
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEnd<'a> {
    pub local_interface: &'a str,
    pub local_ip: IpAddr,
    pub remote: &'a DeviceId,
    pub remote_interface: &'a str,
    pub remote_ip: IpAddr,
}
