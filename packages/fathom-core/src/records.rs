//! Inventory record types.
//!
//! Every scraped category row carries the owning device's `hostname` as the
//! join key back to the base endpoint record. Category rows are replaced
//! wholesale on each refresh, never merged.

use serde::{Deserialize, Serialize};

/// Platform family of a discovered device.
///
/// `Unknown` is a terminal classification, not an error: it means every
/// candidate credential was exhausted without a match, and no scraping will
/// be attempted for the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Unknown,
    CiscoIos,
    CiscoNxos,
    AristaEos,
    PaloaltoPanos,
    Linux,
}

impl DeviceType {
    /// Wire tag used in persisted documents and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Unknown => "unknown",
            DeviceType::CiscoIos => "cisco_ios",
            DeviceType::CiscoNxos => "cisco_nxos",
            DeviceType::AristaEos => "arista_eos",
            DeviceType::PaloaltoPanos => "paloalto_panos",
            DeviceType::Linux => "linux",
        }
    }

    /// True for the three switch CLI families.
    pub fn is_switch(&self) -> bool {
        matches!(
            self,
            DeviceType::CiscoIos | DeviceType::CiscoNxos | DeviceType::AristaEos
        )
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base endpoint record produced by fingerprinting.
///
/// `storage_id` is assigned once the record is persisted and is carried
/// through every queued pipeline stage so later stages can address the
/// stored document; it is never written into the document body itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub ip: String,
    pub hostname: String,
    pub credential_id: u32,
    pub device_type: DeviceType,
    pub update_time: String,
    #[serde(default, skip)]
    pub storage_id: Option<String>,
}

/// One open port with its best-effort service identification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortService {
    pub port: u16,
    pub service: String,
}

/// Result of a TCP port scan against one address.
///
/// Append-only: every scan produces a fresh timestamped document, prior
/// scans are kept for historical comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortScan {
    pub hostname: String,
    pub ip: String,
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    pub open_ports: Vec<PortService>,
}

/// A configured interface parsed out of the running configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interface {
    pub hostname: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Switchport mode (access/trunk) when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Zero or more ip addresses, in configuration order.
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Raw configuration lines of the interface block.
    #[serde(default)]
    pub config: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vlan {
    pub hostname: String,
    pub number: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vrf {
    pub hostname: String,
    pub name: String,
}

/// Which routing table slice a route entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Connected,
    Static,
    Ospf,
}

impl std::fmt::Display for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteKind::Connected => f.write_str("connected"),
            RouteKind::Static => f.write_str("static"),
            RouteKind::Ospf => f.write_str("ospf"),
        }
    }
}

/// One normalized routing-table entry, identical in shape across the three
/// switch families regardless of their output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntry {
    pub hostname: String,
    pub vrf: String,
    pub kind: RouteKind,
    pub subnet: String,
    pub admin_distance: String,
    pub metric: String,
    /// "self" for locally connected routes with no explicit next hop.
    pub next_hop: String,
    pub egress_interface: String,
}

/// An LLDP neighbor adjacency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighbor {
    pub hostname: String,
    pub neighbor_device: String,
    pub neighbor_port: String,
    pub local_port: String,
}

/// One physical inventory item (chassis, module, transceiver).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub hostname: String,
    pub name: String,
    pub description: String,
    pub pid: String,
    pub sn: String,
}

/// An OSPF adjacency from the neighbor-detail output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OspfNeighbor {
    pub neighbor_id: String,
    pub neighbor_address: String,
    pub area: String,
    pub local_interface: String,
    pub priority: String,
    pub state: String,
}

/// Routing-protocol state for one process on a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolState {
    pub hostname: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_id: Option<String>,
    /// VRFs the process is active in.
    pub vrfs: Vec<String>,
    #[serde(default)]
    pub neighbors: Vec<OspfNeighbor>,
}

/// Firewall VPN gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub hostname: String,
    pub name: String,
}

/// Firewall security zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub hostname: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_wire_tags() {
        assert_eq!(DeviceType::CiscoIos.as_str(), "cisco_ios");
        assert_eq!(DeviceType::PaloaltoPanos.as_str(), "paloalto_panos");
        assert_eq!(
            serde_json::to_string(&DeviceType::AristaEos).unwrap(),
            "\"arista_eos\""
        );
        let dt: DeviceType = serde_json::from_str("\"cisco_nxos\"").unwrap();
        assert_eq!(dt, DeviceType::CiscoNxos);
    }

    #[test]
    fn switch_families() {
        assert!(DeviceType::CiscoIos.is_switch());
        assert!(DeviceType::AristaEos.is_switch());
        assert!(!DeviceType::PaloaltoPanos.is_switch());
        assert!(!DeviceType::Unknown.is_switch());
    }

    #[test]
    fn storage_id_not_serialized() {
        let record = DeviceRecord {
            ip: "10.0.0.5".to_string(),
            hostname: "sw1.example.net".to_string(),
            credential_id: 2,
            device_type: DeviceType::CiscoIos,
            update_time: "2024-01-01 00:00:00".to_string(),
            storage_id: Some("abc123".to_string()),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("storage_id").is_none());
        assert_eq!(json["device_type"], "cisco_ios");
    }
}
