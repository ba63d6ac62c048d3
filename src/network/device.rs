use std::{
    fmt::Display,
    net::{IpAddr, Ipv4Addr},
};

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// Opaque identifier of an inventoried device, unique within one collection run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Interface state as handed back by a device fetcher, before normalization.
/// `ip_address` is an `addr/mask` pair where the mask is a prefix length or, for IPv4, a dotted netmask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInterface {
    pub name: String,
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl RawInterface {
    pub fn new(name: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip_address: Some(ip_address.into()),
        }
    }

    /// An interface with no IP configuration.
    pub fn unnumbered(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip_address: None,
        }
    }
}

/// One addressed interface of one device, keyed by its canonical network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub device: DeviceId,
    pub interface: String,
    pub ip: IpAddr,
    pub network: IpNetwork,
}

impl InterfaceRecord {
    /// Normalizes a raw interface into a record.
    /// Returns `None` for interfaces without a name or with a missing/unparsable address;
    /// an interface without IP configuration is not an error.
    pub fn from_raw(device: &DeviceId, raw: &RawInterface) -> Option<Self> {
        if raw.name.is_empty() {
            return None;
        }
        let (ip, network) = parse_cidr(raw.ip_address.as_deref()?)?;
        Some(Self {
            device: device.clone(),
            interface: raw.name.clone(),
            ip,
            network,
        })
    }
}

/// Normalizes every raw interface of a device, silently dropping the unaddressed ones.
pub fn normalize_interfaces(device: &DeviceId, raw: &[RawInterface]) -> Vec<InterfaceRecord> {
    raw.iter()
        .filter_map(|iface| InterfaceRecord::from_raw(device, iface))
        .collect()
}

/// Parses `addr/len` or `a.b.c.d/dotted.mask` into the host address and its canonical network
/// (host bits cleared, e.g. `10.0.0.1/255.255.255.252` -> `10.0.0.0/30`).
pub fn parse_cidr(value: &str) -> Option<(IpAddr, IpNetwork)> {
    let (addr, mask) = value.trim().split_once('/')?;
    let ip: IpAddr = addr.trim().parse().ok()?;
    let mask = mask.trim();
    let prefix = match mask.parse::<u8>() {
        Ok(prefix) => prefix,
        Err(_) => match (ip, mask.parse::<Ipv4Addr>()) {
            (IpAddr::V4(_), Ok(netmask)) => ipnetwork::ipv4_mask_to_prefix(netmask).ok()?,
            _ => return None,
        },
    };
    let network = canonical_network(IpNetwork::new(ip, prefix).ok()?)?;
    Some((ip, network))
}

/// Clears the host bits of a network.
pub fn canonical_network(network: IpNetwork) -> Option<IpNetwork> {
    IpNetwork::new(network.network(), network.prefix()).ok()
}
