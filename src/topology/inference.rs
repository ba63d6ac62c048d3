/*!
Subnet-based link inference.

Interface records from successfully collected devices are grouped by their canonical network.
A network shared by exactly two non-management interfaces becomes one `Link`. Networks with a
single member are stubs; networks with three or more members are shared segments whose pairing
is ambiguous, so they produce no link at all.

Link direction is fixed by device order: the endpoint whose device was listed first becomes `a`.
Endpoints with the same order key (a device sharing a subnet with itself) keep encounter order.
*/

use std::collections::{HashMap, HashSet};

use ipnetwork::IpNetwork;
use tracing::debug;

use crate::{
    network::{
        device::{DeviceId, InterfaceRecord},
        link::Link,
    },
    topology::collector::CollectionReport,
};

pub const DEFAULT_MANAGEMENT_INTERFACES: &[&str] = &["MgmtEth0/RP0/CPU0/0"];

#[derive(Debug, Clone)]
pub struct SubnetLinkInferencer {
    management_interfaces: HashSet<String>,
}

impl Default for SubnetLinkInferencer {
    fn default() -> Self {
        Self::new(DEFAULT_MANAGEMENT_INTERFACES.iter().copied())
    }
}

impl SubnetLinkInferencer {
    pub fn new(management_interfaces: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            management_interfaces: management_interfaces.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_management(&self, interface: &str) -> bool {
        self.management_interfaces.contains(interface)
    }

    /// Infers links from a collection report, using its submission order as device order.
    pub fn infer(&self, report: &CollectionReport) -> Vec<Link> {
        let device_order: Vec<DeviceId> = report.devices().cloned().collect();
        let records: Vec<&InterfaceRecord> = report
            .outcomes()
            .iter()
            .flat_map(|(_, outcome)| outcome.interfaces())
            .collect();
        self.infer_records(&device_order, records)
    }

    /// Infers links from records in encounter order. Devices missing from `device_order`
    /// sort after every listed device.
    pub fn infer_records<'a>(
        &self,
        device_order: &[DeviceId],
        records: impl IntoIterator<Item = &'a InterfaceRecord>,
    ) -> Vec<Link> {
        let order: HashMap<&DeviceId, usize> = device_order
            .iter()
            .enumerate()
            .rev()
            .map(|(i, device)| (device, i))
            .collect();
        let order_of = |device: &DeviceId| order.get(device).copied().unwrap_or(usize::MAX);

        // Groups keep first-seen order so link output is reproducible.
        let mut groups: Vec<(IpNetwork, Vec<&InterfaceRecord>)> = Vec::new();
        let mut group_index: HashMap<IpNetwork, usize> = HashMap::new();
        for record in records {
            if self.is_management(&record.interface) {
                continue;
            }
            let index = *group_index.entry(record.network).or_insert_with(|| {
                groups.push((record.network, Vec::new()));
                groups.len() - 1
            });
            groups[index].1.push(record);
        }

        let mut links = Vec::new();
        for (network, members) in groups {
            match members.as_slice() {
                [first, second] => {
                    let (source, target) = if order_of(&second.device) < order_of(&first.device) {
                        (second, first)
                    } else {
                        (first, second)
                    };
                    links.push(Link::between(source, target));
                }
                [_] => {}
                _ => {
                    debug!(network = %network, members = members.len(), "skipping shared segment with ambiguous pairing");
                }
            }
        }
        debug!(links = links.len(), "inferred links");
        links
    }
}
