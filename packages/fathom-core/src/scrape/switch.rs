//! Switch-family CLI scraper.
//!
//! Runs show-commands over an open [`SwitchSession`] and normalizes the
//! output into record types, with family-specific parsing rules for the
//! IOS, NX-OS and EOS trains. Each extraction re-derives its result from
//! command output; nothing accumulates between calls.
//!
//! The session-facing methods are thin: every parsing rule lives in a
//! pure function over captured text so the rules are testable against
//! CLI fixtures.

use serde_json::Value;

use super::patterns::*;
use crate::credentials::Credential;
use crate::records::{
    DeviceRecord, DeviceType, EquipmentItem, Interface, Neighbor, OspfNeighbor, ProtocolState,
    RouteEntry, RouteKind, Vlan, Vrf,
};
use crate::session::{SessionError, SwitchSession};

/// Scraper bound to one open switch CLI session.
pub struct SwitchScraper {
    session: SwitchSession,
    device_type: DeviceType,
    hostname: String,
    line_config: Option<Vec<String>>,
    vrfs: Option<Vec<Vrf>>,
}

impl SwitchScraper {
    /// Open an enable-mode session for the record and wrap it.
    pub async fn open(record: &DeviceRecord, credential: &Credential) -> Result<Self, SessionError> {
        let session = SwitchSession::open(&record.ip, credential, &record.hostname).await?;
        Ok(Self::new(session, record.device_type, &record.hostname))
    }

    pub fn new(session: SwitchSession, device_type: DeviceType, hostname: &str) -> Self {
        Self {
            session,
            device_type,
            hostname: hostname.to_string(),
            line_config: None,
            vrfs: None,
        }
    }

    /// Pull the running configuration and keep it as delimiter-normalized
    /// lines for the block parsers. Fetched once per session.
    pub async fn fetch_config(&mut self) -> Result<&[String], SessionError> {
        if self.line_config.is_none() {
            let raw = self.session.run_command("show running-config").await?;
            self.line_config = Some(normalize_config(&raw));
        }
        Ok(self.line_config.as_deref().unwrap_or_default())
    }

    /// Interfaces from the running configuration.
    pub async fn interfaces(&mut self) -> Result<Vec<Interface>, SessionError> {
        self.fetch_config().await?;
        let lines = self.line_config.as_deref().unwrap_or_default();
        Ok(parse_interfaces(lines, &self.hostname))
    }

    /// VLAN table. EOS prefers the structured form when the train
    /// supports it; everything else uses the brief text rows. Unsupported
    /// command output degrades to an empty table.
    pub async fn vlans(&mut self) -> Result<Vec<Vlan>, SessionError> {
        if self.device_type == DeviceType::AristaEos {
            let raw = self.session.run_command("show vlan | json").await?;
            if let Some(vlans) = parse_vlans_eos_json(&raw, &self.hostname) {
                return Ok(vlans);
            }
        }

        let raw = self.session.run_command("show vlan brief").await?;
        Ok(parse_vlans_text(&raw, &self.hostname))
    }

    /// VRF names from the running configuration.
    pub async fn vrfs(&mut self) -> Result<Vec<Vrf>, SessionError> {
        if self.vrfs.is_none() {
            self.fetch_config().await?;
            let lines = self.line_config.as_deref().unwrap_or_default();
            self.vrfs = Some(parse_vrfs(lines, self.device_type, &self.hostname));
        }
        Ok(self.vrfs.clone().unwrap_or_default())
    }

    /// One routing-table slice, walked per VRF.
    pub async fn routes(&mut self, kind: RouteKind) -> Result<Vec<RouteEntry>, SessionError> {
        let vrfs = self.vrfs().await?;
        let mut entries = Vec::new();

        for vrf in &vrfs {
            let command = route_command(self.device_type, kind, &vrf.name);
            let raw = self.session.run_command(&command).await?;
            entries.extend(parse_routes(
                &raw,
                self.device_type,
                kind,
                &vrf.name,
                &self.hostname,
            ));
        }

        Ok(entries)
    }

    /// LLDP neighbor adjacencies.
    pub async fn neighbors(&mut self) -> Result<Vec<Neighbor>, SessionError> {
        match self.device_type {
            DeviceType::AristaEos => {
                let raw = self.session.run_command("show lldp neighbors | json").await?;
                Ok(parse_neighbors_eos_json(&raw, &self.hostname))
            }
            _ => {
                let raw = self.session.run_command("show lldp neighbors detail").await?;
                Ok(parse_neighbors_ios(&raw, &self.hostname))
            }
        }
    }

    /// Physical inventory.
    pub async fn equipment(&mut self) -> Result<Vec<EquipmentItem>, SessionError> {
        match self.device_type {
            DeviceType::AristaEos => {
                let raw = self.session.run_command("show inventory | json").await?;
                Ok(parse_equipment_eos_json(&raw, &self.hostname))
            }
            _ => {
                let raw = self.session.run_command("show inventory").await?;
                Ok(parse_equipment_pairwise(&raw, &self.hostname))
            }
        }
    }

    /// Routing-protocol state with OSPF neighbor detail.
    pub async fn protocols(&mut self) -> Result<Vec<ProtocolState>, SessionError> {
        let mut states = match self.device_type {
            DeviceType::CiscoIos => {
                let vrfs = self.vrfs().await?;
                let mut states: Vec<ProtocolState> = Vec::new();

                for vrf in &vrfs {
                    let raw = self
                        .session
                        .run_command(&format!("show ip protocols vrf {}", vrf.name))
                        .await?;

                    for protocol in parse_ios_protocol_names(&raw) {
                        let router_id = if protocol.contains("ospf") {
                            let raw = self
                                .session
                                .run_command(&format!("show ip {}", protocol))
                                .await?;
                            parse_ios_router_id(&raw, &protocol)
                        } else {
                            None
                        };
                        merge_protocol(&mut states, &self.hostname, &protocol, router_id, &vrf.name);
                    }
                }

                states
            }
            DeviceType::AristaEos => {
                let raw = self.session.run_command("show ip ospf").await?;
                parse_eos_protocols(&raw, &self.hostname)
            }
            _ => Vec::new(),
        };

        // Neighbor-detail enrichment for OSPF processes
        for state in &mut states {
            if !state.protocol.contains("ospf") {
                continue;
            }
            let raw = self
                .session
                .run_command(&format!("show ip {} neighbor detail", state.protocol))
                .await?;
            state.neighbors = match self.device_type {
                DeviceType::AristaEos => parse_eos_ospf_neighbors(&raw),
                _ => parse_ios_ospf_neighbors(&raw),
            };
        }

        Ok(states)
    }

    /// Key/value harvest of `show version` for the endpoint details
    /// index.
    pub async fn version_details(&mut self) -> Result<Value, SessionError> {
        let raw = self.session.run_command("show version").await?;
        Ok(parse_version_details(&raw, &self.hostname))
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

/// The routing command for a family/kind/VRF combination. NX-OS calls
/// the connected table `direct`.
fn route_command(device_type: DeviceType, kind: RouteKind, vrf: &str) -> String {
    let slice = match (device_type, kind) {
        (DeviceType::CiscoNxos, RouteKind::Connected) => "direct",
        (_, RouteKind::Connected) => "connected",
        (_, RouteKind::Static) => "static",
        (_, RouteKind::Ospf) => "ospf",
    };
    format!("show ip route vrf {} {}", vrf, slice)
}

// ---------------------------------------------------------------------
// Pure parsers
// ---------------------------------------------------------------------

/// Split the raw configuration into lines, normalizing blanks to the `!`
/// delimiter the block parsers stop on.
pub(crate) fn normalize_config(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                "!".to_string()
            } else {
                line.to_string()
            }
        })
        .collect()
}

/// Extract every `interface <name>` block from the configuration.
pub(crate) fn parse_interfaces(lines: &[String], hostname: &str) -> Vec<Interface> {
    let mut interfaces = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(name) = lines[i].strip_prefix("interface ") else {
            i += 1;
            continue;
        };

        let mut interface = Interface {
            hostname: hostname.to_string(),
            name: name.trim().to_string(),
            description: None,
            mode: None,
            addresses: Vec::new(),
            config: Vec::new(),
        };

        i += 1;
        while i < lines.len() && lines[i] != "!" {
            let line = &lines[i];
            if let Some(rest) = line.strip_prefix(' ') {
                interface.config.push(rest.to_string());
            }

            let trimmed = line.trim_start();
            if let Some(description) = trimmed.strip_prefix("description ") {
                interface.description = Some(description.to_string());
            }
            if let Some(mode) = trimmed.strip_prefix("switchport mode ") {
                interface.mode = Some(mode.to_string());
            }
            if let Some(address) = trimmed.strip_prefix("ip address ") {
                interface.addresses.push(address.to_string());
            }
            i += 1;
        }

        interfaces.push(interface);
    }

    interfaces
}

/// VLAN brief rows: id then name. Error text (`% Invalid input`) matches
/// nothing and yields an empty table.
pub(crate) fn parse_vlans_text(raw: &str, hostname: &str) -> Vec<Vlan> {
    raw.lines()
        .filter_map(|line| RE_VLAN_ROW.captures(line))
        .map(|caps| Vlan {
            hostname: hostname.to_string(),
            number: caps[1].to_string(),
            name: caps[2].to_string(),
        })
        .collect()
}

/// Structured EOS VLAN payload. `None` when the payload is not JSON
/// (unsupported train, `% Invalid input`), so the caller can fall back
/// to the text form.
pub(crate) fn parse_vlans_eos_json(raw: &str, hostname: &str) -> Option<Vec<Vlan>> {
    let payload: Value = serde_json::from_str(raw.trim()).ok()?;
    let vlans = payload.get("vlans")?.as_object()?;

    Some(
        vlans
            .iter()
            .map(|(number, body)| Vlan {
                hostname: hostname.to_string(),
                number: number.clone(),
                name: body
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            })
            .collect(),
    )
}

/// VRF definitions in the configuration. NX-OS spells the keyword
/// `vrf context`, the other families `vrf definition`.
pub(crate) fn parse_vrfs(lines: &[String], device_type: DeviceType, hostname: &str) -> Vec<Vrf> {
    let keyword = if device_type == DeviceType::CiscoNxos {
        "vrf context "
    } else {
        "vrf definition "
    };

    lines
        .iter()
        .filter_map(|line| {
            line.find(keyword)
                .map(|at| line[at + keyword.len()..].trim().to_string())
        })
        .filter(|name| !name.is_empty())
        .map(|name| Vrf {
            hostname: hostname.to_string(),
            name,
        })
        .collect()
}

/// Normalize one routing-table slice for a VRF, using the family's
/// output shape.
pub(crate) fn parse_routes(
    raw: &str,
    device_type: DeviceType,
    kind: RouteKind,
    vrf: &str,
    hostname: &str,
) -> Vec<RouteEntry> {
    match device_type {
        DeviceType::CiscoNxos => parse_routes_nxos(raw, kind, vrf, hostname),
        DeviceType::CiscoIos | DeviceType::AristaEos => match kind {
            RouteKind::Connected => parse_routes_connected_text(raw, vrf, hostname),
            RouteKind::Static => parse_routes_static_text(raw, vrf, hostname),
            RouteKind::Ospf => {
                if device_type == DeviceType::AristaEos {
                    parse_routes_ospf_eos(raw, vrf, hostname)
                } else {
                    parse_routes_ospf_ios(raw, vrf, hostname)
                }
            }
        },
        _ => Vec::new(),
    }
}

/// IOS/EOS connected routes carry no next hop; the device itself is the
/// hop, recorded as the literal "self".
fn parse_routes_connected_text(raw: &str, vrf: &str, hostname: &str) -> Vec<RouteEntry> {
    raw.lines()
        .filter_map(|line| RE_IOS_CONNECTED.captures(line))
        .map(|caps| RouteEntry {
            hostname: hostname.to_string(),
            vrf: vrf.to_string(),
            kind: RouteKind::Connected,
            subnet: caps[1].to_string(),
            admin_distance: "0".to_string(),
            metric: "0".to_string(),
            next_hop: "self".to_string(),
            egress_interface: caps[2].trim().to_string(),
        })
        .collect()
}

fn parse_routes_static_text(raw: &str, vrf: &str, hostname: &str) -> Vec<RouteEntry> {
    raw.lines()
        .filter_map(|line| RE_IOS_STATIC.captures(line))
        .map(|caps| RouteEntry {
            hostname: hostname.to_string(),
            vrf: vrf.to_string(),
            kind: RouteKind::Static,
            subnet: caps[1].to_string(),
            admin_distance: caps[2].to_string(),
            metric: caps[3].to_string(),
            next_hop: caps[4].to_string(),
            egress_interface: "unknown".to_string(),
        })
        .collect()
}

/// IOS OSPF table. Primary lines start with the `O` protocol marker and
/// carry the subnet; secondary (load-balanced) lines immediately below
/// omit it and inherit the subnet of the preceding primary line. The
/// current subnet is threaded explicitly across line matches.
fn parse_routes_ospf_ios(raw: &str, vrf: &str, hostname: &str) -> Vec<RouteEntry> {
    let mut entries = Vec::new();
    let mut current_subnet: Option<String> = None;

    for line in raw.lines() {
        let Some(caps) = RE_IOS_OSPF.captures(line) else {
            continue;
        };

        let head = &caps[1];
        if head.trim_start().starts_with('O') {
            current_subnet = RE_CIDR
                .find(head)
                .or_else(|| RE_BARE_IP.find(head))
                .map(|m| m.as_str().to_string());
        }

        let Some(subnet) = current_subnet.clone() else {
            continue;
        };

        entries.push(RouteEntry {
            hostname: hostname.to_string(),
            vrf: vrf.to_string(),
            kind: RouteKind::Ospf,
            subnet,
            admin_distance: caps[2].to_string(),
            metric: caps[3].to_string(),
            next_hop: caps[4].trim().to_string(),
            egress_interface: caps[6].trim().to_string(),
        });
    }

    entries
}

/// EOS OSPF table: every line carries its own subnet.
fn parse_routes_ospf_eos(raw: &str, vrf: &str, hostname: &str) -> Vec<RouteEntry> {
    raw.lines()
        .filter_map(|line| RE_EOS_OSPF.captures(line))
        .map(|caps| RouteEntry {
            hostname: hostname.to_string(),
            vrf: vrf.to_string(),
            kind: RouteKind::Ospf,
            subnet: caps[2].to_string(),
            admin_distance: caps[3].to_string(),
            metric: caps[4].to_string(),
            next_hop: caps[5].to_string(),
            egress_interface: caps[6].trim().to_string(),
        })
        .collect()
}

/// NX-OS prints every kind with the same two-line `*via` shape; only the
/// static slice omits the egress interface.
fn parse_routes_nxos(raw: &str, kind: RouteKind, vrf: &str, hostname: &str) -> Vec<RouteEntry> {
    match kind {
        RouteKind::Static => RE_NXOS_VIA_SHORT
            .captures_iter(raw)
            .map(|caps| RouteEntry {
                hostname: hostname.to_string(),
                vrf: vrf.to_string(),
                kind,
                subnet: caps[1].to_string(),
                admin_distance: caps[3].to_string(),
                metric: caps[4].to_string(),
                next_hop: caps[2].to_string(),
                egress_interface: "unknown".to_string(),
            })
            .collect(),
        _ => RE_NXOS_VIA_FULL
            .captures_iter(raw)
            .map(|caps| RouteEntry {
                hostname: hostname.to_string(),
                vrf: vrf.to_string(),
                kind,
                subnet: caps[1].to_string(),
                admin_distance: caps[4].to_string(),
                metric: caps[5].to_string(),
                next_hop: caps[2].to_string(),
                egress_interface: caps[3].to_string(),
            })
            .collect(),
    }
}

/// IOS LLDP neighbor detail: dashed-line separated blocks. Separator
/// width varies across trains, so any long run of dashes opens a block.
pub(crate) fn parse_neighbors_ios(raw: &str, hostname: &str) -> Vec<Neighbor> {
    fn is_separator(line: &str) -> bool {
        let line = line.trim();
        line.len() >= 20 && line.chars().all(|c| c == '-')
    }

    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut neighbors = Vec::new();
    let mut current: Option<Neighbor> = None;

    for line in lines {
        if is_separator(line) {
            if let Some(neighbor) = current.take() {
                neighbors.push(neighbor);
            }
            current = Some(Neighbor {
                hostname: hostname.to_string(),
                neighbor_device: String::new(),
                neighbor_port: String::new(),
                local_port: String::new(),
            });
            continue;
        }

        let Some(neighbor) = current.as_mut() else {
            continue;
        };

        if let Some(value) = line.strip_prefix("Local Intf: ") {
            neighbor.local_port = value.replace(' ', "");
        }
        if let Some(value) = line.strip_prefix("Port id: ") {
            neighbor.neighbor_port = value.replace(' ', "");
        }
        if let Some(value) = line.strip_prefix("System Name: ") {
            neighbor.neighbor_device = value.replace(' ', "");
        }
    }

    if let Some(neighbor) = current.take() {
        neighbors.push(neighbor);
    }

    neighbors
}

/// EOS structured LLDP payload. A garbled or missing payload
/// (`json: command not found`) is an empty list, not an error.
pub(crate) fn parse_neighbors_eos_json(raw: &str, hostname: &str) -> Vec<Neighbor> {
    let Ok(payload) = serde_json::from_str::<Value>(raw.trim()) else {
        return Vec::new();
    };

    let Some(entries) = payload.get("lldpNeighbors").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .map(|entry| Neighbor {
            hostname: hostname.to_string(),
            neighbor_device: str_field(entry, "neighborDevice"),
            neighbor_port: str_field(entry, "neighborPort"),
            local_port: str_field(entry, "port"),
        })
        .collect()
}

/// IOS/NX `show inventory`: a NAME/DESCR line immediately followed by a
/// PID/SN line describes one item.
pub(crate) fn parse_equipment_pairwise(raw: &str, hostname: &str) -> Vec<EquipmentItem> {
    let lines: Vec<&str> = raw.lines().collect();
    let mut equipment = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if !line.contains("NAME") {
            continue;
        }

        // Pad both lines so the lazy `\s`-terminated patterns always
        // have a boundary to stop at.
        let line1 = format!(" {} ", line);
        let line2 = format!(" {} ", lines.get(index + 1).unwrap_or(&""));

        equipment.push(EquipmentItem {
            hostname: hostname.to_string(),
            name: capture_first(&RE_INV_NAME, &line1),
            description: capture_first(&RE_INV_DESCR, &line1),
            pid: capture_first(&RE_INV_PID, &line2),
            sn: capture_first(&RE_INV_SN, &line2),
        });
    }

    equipment
}

/// EOS structured inventory: the chassis, then every transceiver slot
/// that actually has a module (empty serials are unpopulated slots).
pub(crate) fn parse_equipment_eos_json(raw: &str, hostname: &str) -> Vec<EquipmentItem> {
    let Ok(payload) = serde_json::from_str::<Value>(raw.trim()) else {
        return Vec::new();
    };

    let mut equipment = Vec::new();

    if let Some(system) = payload.get("systemInformation") {
        equipment.push(EquipmentItem {
            hostname: hostname.to_string(),
            name: str_field(system, "name"),
            description: str_field(system, "description"),
            pid: str_field(system, "name"),
            sn: str_field(system, "serialNum"),
        });
    }

    if let Some(slots) = payload.get("xcvrSlots").and_then(Value::as_object) {
        for (slot, body) in slots {
            let serial = str_field(body, "serialNum");
            if serial.is_empty() {
                continue;
            }
            equipment.push(EquipmentItem {
                hostname: hostname.to_string(),
                name: slot.clone(),
                description: str_field(body, "modelName"),
                pid: str_field(body, "modelName"),
                sn: serial,
            });
        }
    }

    equipment
}

/// Protocol instance names from IOS `show ip protocols` output.
pub(crate) fn parse_ios_protocol_names(raw: &str) -> Vec<String> {
    RE_IOS_PROTOCOL
        .captures_iter(raw)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Router id for one IOS OSPF process.
pub(crate) fn parse_ios_router_id(raw: &str, protocol: &str) -> Option<String> {
    let pattern = format!(
        r#"Routing Process "{}" with ID (\S+)"#,
        regex::escape(protocol)
    );
    let re = regex::Regex::new(&pattern).ok()?;
    re.captures(raw).map(|caps| caps[1].to_string())
}

/// EOS `show ip ospf` lists every process with its router id and VRF in
/// one output.
pub(crate) fn parse_eos_protocols(raw: &str, hostname: &str) -> Vec<ProtocolState> {
    let mut states: Vec<ProtocolState> = Vec::new();

    for caps in RE_EOS_OSPF_PROCESS.captures_iter(raw) {
        let protocol = caps[1].to_string();
        let router_id = Some(caps[2].to_string());
        let vrf = caps[3].to_string();
        merge_protocol(&mut states, hostname, &protocol, router_id, &vrf);
    }

    states
}

/// Fold one (protocol, vrf) observation into the per-process states.
pub(crate) fn merge_protocol(
    states: &mut Vec<ProtocolState>,
    hostname: &str,
    protocol: &str,
    router_id: Option<String>,
    vrf: &str,
) {
    if let Some(state) = states.iter_mut().find(|s| s.protocol == protocol) {
        if !state.vrfs.iter().any(|v| v == vrf) {
            state.vrfs.push(vrf.to_string());
        }
        if state.router_id.is_none() {
            state.router_id = router_id;
        }
    } else {
        states.push(ProtocolState {
            hostname: hostname.to_string(),
            protocol: protocol.to_string(),
            router_id,
            vrfs: vec![vrf.to_string()],
            neighbors: Vec::new(),
        });
    }
}

pub(crate) fn parse_ios_ospf_neighbors(raw: &str) -> Vec<OspfNeighbor> {
    RE_IOS_OSPF_NEIGHBOR
        .captures_iter(raw)
        .map(|caps| OspfNeighbor {
            neighbor_id: caps[1].to_string(),
            neighbor_address: caps[2].to_string(),
            area: caps[3].to_string(),
            local_interface: caps[4].to_string(),
            priority: caps[5].to_string(),
            state: caps[6].to_string(),
        })
        .collect()
}

pub(crate) fn parse_eos_ospf_neighbors(raw: &str) -> Vec<OspfNeighbor> {
    RE_EOS_OSPF_NEIGHBOR
        .captures_iter(raw)
        .map(|caps| OspfNeighbor {
            neighbor_id: caps[1].to_string(),
            neighbor_address: caps[3].to_string(),
            area: caps[4].to_string(),
            local_interface: caps[5].to_string(),
            priority: caps[6].to_string(),
            state: caps[7].to_string(),
        })
        .collect()
}

/// Harvest `show version` into normalized key/value endpoint details.
/// Keys and values are lowercased with spaces collapsed to underscores,
/// matching the detail documents the dashboard queries.
pub(crate) fn parse_version_details(raw: &str, hostname: &str) -> Value {
    let mut details = serde_json::Map::new();

    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = normalize_detail_token(key);
        let value = normalize_detail_token(value);
        if key.is_empty() || value.is_empty() {
            continue;
        }
        details.entry(key).or_insert(Value::String(value));
    }

    details.insert(
        "hostname".to_string(),
        Value::String(hostname.to_string()),
    );

    Value::Object(details)
}

fn normalize_detail_token(token: &str) -> String {
    token.trim().to_lowercase().replace(' ', "_")
}

fn capture_first(re: &regex::Regex, haystack: &str) -> String {
    re.captures(haystack)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

fn str_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_blank_lines_become_delimiters() {
        let raw = "hostname sw1\n\ninterface Vlan100\n description uplink\n!\r\nend";
        let lines = normalize_config(raw);
        assert_eq!(lines[1], "!");
        assert_eq!(lines[4], "!");
        assert_eq!(lines[5], "end");
    }

    #[test]
    fn interface_blocks_are_extracted() {
        let config = "\
hostname sw1
!
interface GigabitEthernet1/0/1
 description uplink to core
 switchport mode trunk
!
interface Vlan100
 description users
 ip address 10.1.100.1 255.255.255.0
 ip address 10.1.200.1 255.255.255.0 secondary
!
end";
        let lines = normalize_config(config);
        let interfaces = parse_interfaces(&lines, "sw1");

        assert_eq!(interfaces.len(), 2);

        let gi = &interfaces[0];
        assert_eq!(gi.name, "GigabitEthernet1/0/1");
        assert_eq!(gi.description.as_deref(), Some("uplink to core"));
        assert_eq!(gi.mode.as_deref(), Some("trunk"));
        assert!(gi.addresses.is_empty());
        assert_eq!(gi.config.len(), 2);

        let vlan100 = &interfaces[1];
        assert_eq!(vlan100.addresses.len(), 2);
        assert_eq!(vlan100.addresses[0], "10.1.100.1 255.255.255.0");
        assert_eq!(vlan100.addresses[1], "10.1.200.1 255.255.255.0 secondary");
        assert_eq!(vlan100.hostname, "sw1");
    }

    #[test]
    fn negated_ip_address_lines_are_not_addresses() {
        let lines = normalize_config("interface Vlan5\n no ip address\n!");
        let interfaces = parse_interfaces(&lines, "sw1");
        assert!(interfaces[0].addresses.is_empty());
    }

    #[test]
    fn vlan_brief_rows() {
        let raw = "\
VLAN Name                             Status    Ports
---- -------------------------------- --------- ----------
1    default                          active    Gi1/0/2
100  users                            active    Gi1/0/3
200  voice                            active";
        let vlans = parse_vlans_text(raw, "sw1");
        assert_eq!(vlans.len(), 3);
        assert_eq!(vlans[1].number, "100");
        assert_eq!(vlans[1].name, "users");
    }

    #[test]
    fn unsupported_vlan_command_degrades_to_empty() {
        let raw = "% Invalid input detected at '^' marker.";
        assert!(parse_vlans_text(raw, "sw1").is_empty());
        assert!(parse_vlans_eos_json(raw, "sw1").is_none());
    }

    #[test]
    fn eos_vlan_json_is_preferred_shape() {
        let raw = r#"{"vlans": {"1": {"name": "default", "status": "active"},
                      "100": {"name": "users", "status": "active"}}}"#;
        let vlans = parse_vlans_eos_json(raw, "sw1").unwrap();
        assert_eq!(vlans.len(), 2);
        assert!(vlans.iter().any(|v| v.number == "100" && v.name == "users"));
    }

    #[test]
    fn vrf_keywords_per_family() {
        let ios = normalize_config("vrf definition MGMT\n!\nvrf definition CUST-A\n!");
        let vrfs = parse_vrfs(&ios, DeviceType::CiscoIos, "sw1");
        assert_eq!(vrfs.len(), 2);
        assert_eq!(vrfs[0].name, "MGMT");

        let nxos = normalize_config("vrf context management\n!\nvrf definition ignored-on-nxos\n!");
        let vrfs = parse_vrfs(&nxos, DeviceType::CiscoNxos, "sw2");
        assert_eq!(vrfs.len(), 1);
        assert_eq!(vrfs[0].name, "management");
    }

    #[test]
    fn connected_routes_synthesize_self_next_hop() {
        let raw = "\
C        10.20.30.0/24 is directly connected, Vlan100
L        10.20.30.1/32 is directly connected, Vlan100
C        10.20.40.0/24 is directly connected, Vlan200";
        let routes = parse_routes(raw, DeviceType::CiscoIos, RouteKind::Connected, "default", "sw1");
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].next_hop, "self");
        assert_eq!(routes[0].admin_distance, "0");
        assert_eq!(routes[0].egress_interface, "Vlan100");
        assert_eq!(routes[1].subnet, "10.20.40.0/24");
    }

    #[test]
    fn static_routes_text() {
        let raw = "S        192.168.50.0/24 [1/0] via 10.0.0.1";
        let routes = parse_routes(raw, DeviceType::AristaEos, RouteKind::Static, "default", "sw1");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].next_hop, "10.0.0.1");
        assert_eq!(routes[0].egress_interface, "unknown");
        assert_eq!(routes[0].admin_distance, "1");
    }

    #[test]
    fn ospf_secondary_lines_inherit_the_primary_subnet() {
        let raw = "\
O        10.1.2.0/24 [110/41] via 10.0.0.2, 3w4d, Vlan100
                     [110/41] via 10.0.0.6, 3w4d, Vlan101
                     [110/41] via 10.0.0.10, 3w4d, Vlan102
O        10.1.3.0/24 [110/20] via 10.0.0.2, 3w4d, Vlan100";
        let routes = parse_routes(raw, DeviceType::CiscoIos, RouteKind::Ospf, "default", "sw1");

        assert_eq!(routes.len(), 4);
        assert_eq!(routes[0].subnet, "10.1.2.0/24");
        assert_eq!(routes[1].subnet, "10.1.2.0/24");
        assert_eq!(routes[2].subnet, "10.1.2.0/24");
        assert_eq!(routes[1].next_hop, "10.0.0.6");
        assert_eq!(routes[2].egress_interface, "Vlan102");
        assert_eq!(routes[3].subnet, "10.1.3.0/24");
    }

    #[test]
    fn ospf_secondary_with_no_preceding_primary_is_dropped() {
        let raw = "                     [110/41] via 10.0.0.6, 3w4d, Vlan101";
        let routes = parse_routes(raw, DeviceType::CiscoIos, RouteKind::Ospf, "default", "sw1");
        assert!(routes.is_empty());
    }

    #[test]
    fn eos_ospf_routes_carry_their_own_subnet() {
        let raw = " O        10.1.2.0/24 [110/20] via 10.0.0.2, Vlan100";
        let routes = parse_routes(raw, DeviceType::AristaEos, RouteKind::Ospf, "default", "sw1");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].subnet, "10.1.2.0/24");
        assert_eq!(routes[0].metric, "20");
        assert_eq!(routes[0].egress_interface, "Vlan100");
    }

    #[test]
    fn nxos_two_line_routes() {
        let raw = "\
10.1.1.0/24, ubest/mbest: 1/0, attached
    *via 10.1.1.1, Vlan10, [0/0], 3w4d, direct
10.9.0.0/16, ubest/mbest: 1/0
    *via 10.1.1.254, Eth1/49, [110/80], 3w4d, ospf-1, intra";
        let routes = parse_routes(raw, DeviceType::CiscoNxos, RouteKind::Connected, "default", "nx1");
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].subnet, "10.1.1.0/24");
        assert_eq!(routes[0].next_hop, "10.1.1.1");
        assert_eq!(routes[0].egress_interface, "Vlan10");
        assert_eq!(routes[1].admin_distance, "110");
        assert_eq!(routes[1].metric, "80");

        let raw_static = "\
0.0.0.0/0, ubest/mbest: 1/0
    *via 10.1.1.254, [1/0], 5w0d, static";
        let routes = parse_routes(raw_static, DeviceType::CiscoNxos, RouteKind::Static, "default", "nx1");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].next_hop, "10.1.1.254");
        assert_eq!(routes[0].egress_interface, "unknown");
    }

    #[test]
    fn ios_lldp_neighbor_blocks() {
        let raw = "\
Capability codes: (R) Router, (B) Bridge
------------------------------------------------
Local Intf: Gi1/0/48
Chassis id: 00aa.bb11.cc22
Port id: Eth1/1
System Name: core1.example.net

------------------------------------------------
Local Intf: Gi1/0/47
Port id: ge-0/0/0
System Name: access2

Total entries displayed: 2";
        let neighbors = parse_neighbors_ios(raw, "sw1");
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].local_port, "Gi1/0/48");
        assert_eq!(neighbors[0].neighbor_port, "Eth1/1");
        assert_eq!(neighbors[0].neighbor_device, "core1.example.net");
        assert_eq!(neighbors[1].neighbor_device, "access2");
    }

    #[test]
    fn eos_lldp_json() {
        let raw = r#"{"lldpNeighbors": [
            {"neighborDevice": "core1", "neighborPort": "Ethernet1", "port": "Ethernet49"},
            {"neighborDevice": "core2", "neighborPort": "Ethernet1", "port": "Ethernet50"}]}"#;
        let neighbors = parse_neighbors_eos_json(raw, "eos1");
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].local_port, "Ethernet49");
        assert_eq!(neighbors[1].neighbor_device, "core2");
    }

    #[test]
    fn garbled_lldp_json_is_an_empty_list() {
        assert!(parse_neighbors_eos_json("json: command not found", "eos1").is_empty());
        assert!(parse_neighbors_eos_json("{}", "eos1").is_empty());
    }

    #[test]
    fn inventory_pairwise_extraction() {
        let raw = "\
NAME: \"1\", DESCR: \"WS-C3750E-24TD\"
PID: WS-C3750E-24TD-S  , VID: V02  , SN: FDO1129Z5GX

NAME: \"GigabitEthernet1/0/1\", DESCR: \"10/100/1000BaseTX\"
PID: unspecified       , VID:      , SN:";
        let equipment = parse_equipment_pairwise(raw, "sw1");

        assert_eq!(equipment.len(), 2);
        assert_eq!(equipment[0].name, "1");
        assert_eq!(equipment[0].description, "WS-C3750E-24TD");
        assert_eq!(equipment[0].pid, "WS-C3750E-24TD-S");
        assert_eq!(equipment[0].sn, "FDO1129Z5GX");
        assert_eq!(equipment[1].name, "GigabitEthernet1/0/1");
    }

    #[test]
    fn eos_inventory_skips_empty_transceiver_slots() {
        let raw = r#"{
            "systemInformation": {"name": "DCS-7050QX-32S", "description": "32x QSFP+", "serialNum": "JPE17233041"},
            "xcvrSlots": {
                "1": {"modelName": "QSFP-40G-SR4", "serialNum": "XMD1111"},
                "2": {"modelName": "", "serialNum": ""}
            }}"#;
        let equipment = parse_equipment_eos_json(raw, "eos1");
        assert_eq!(equipment.len(), 2);
        assert_eq!(equipment[0].pid, "DCS-7050QX-32S");
        assert_eq!(equipment[1].name, "1");
        assert_eq!(equipment[1].sn, "XMD1111");
    }

    #[test]
    fn ios_protocol_discovery() {
        let raw = "\
Routing Protocol is \"ospf 1\"
  Outgoing update filter list for all interfaces is not set
Routing Protocol is \"bgp 65000\"
  Outgoing update filter list for all interfaces is not set";
        let names = parse_ios_protocol_names(raw);
        assert_eq!(names, vec!["ospf 1".to_string(), "bgp 65000".to_string()]);

        let rid_raw = " Routing Process \"ospf 1\" with ID 10.255.0.1\n Supports only single TOS(TOS0) routes";
        assert_eq!(
            parse_ios_router_id(rid_raw, "ospf 1").as_deref(),
            Some("10.255.0.1")
        );
        assert!(parse_ios_router_id("no process here", "ospf 1").is_none());
    }

    #[test]
    fn eos_protocol_discovery_groups_vrfs() {
        let raw = "\
Routing Process \"ospf 1\" with ID 10.255.0.2 VRF default
Routing Process \"ospf 1\" with ID 10.255.1.2 VRF CUST-A";
        let states = parse_eos_protocols(raw, "eos1");
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].vrfs, vec!["default".to_string(), "CUST-A".to_string()]);
        assert_eq!(states[0].router_id.as_deref(), Some("10.255.0.2"));
    }

    #[test]
    fn ios_ospf_neighbor_detail() {
        let raw = "\
 Neighbor 10.255.0.3, interface address 10.0.0.2
    In the area 0 via interface Vlan100
    Neighbor priority is 1, State is FULL, 6 state changes
 Neighbor 10.255.0.4, interface address 10.0.0.6
    In the area 0 via interface Vlan101
    Neighbor priority is 1, State is FULL, 4 state changes";
        let neighbors = parse_ios_ospf_neighbors(raw);
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].neighbor_id, "10.255.0.3");
        assert_eq!(neighbors[0].area, "0");
        assert_eq!(neighbors[0].local_interface, "Vlan100");
        assert_eq!(neighbors[0].state, "FULL");
    }

    #[test]
    fn eos_ospf_neighbor_detail() {
        let raw = "\
 Neighbor 10.255.0.3, VRF default, interface address 10.0.0.2
  In area 0.0.0.0 interface Vlan100
  Neighbor priority is 1, State is FULL, roles...";
        let neighbors = parse_eos_ospf_neighbors(raw);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].neighbor_address, "10.0.0.2");
        assert_eq!(neighbors[0].state, "FULL");
    }

    #[test]
    fn version_details_are_normalized_key_values() {
        let raw = "\
Cisco IOS Software, C3750E Software
ROM: Bootstrap program is C3750E boot loader
System returned to ROM by power-on
System image file is \"flash:c3750e-universalk9-mz.152-4.E7.bin\"
Base ethernet MAC Address       : 00:AA:BB:11:22:33
Motherboard assembly number     : 73-11111-08";
        let details = parse_version_details(raw, "sw1");
        assert_eq!(details["hostname"], "sw1");
        assert_eq!(details["base_ethernet_mac_address"], "00:aa:bb:11:22:33");
        assert!(details.get("rom").is_some());
    }

    #[test]
    fn route_commands_per_family() {
        assert_eq!(
            route_command(DeviceType::CiscoNxos, RouteKind::Connected, "default"),
            "show ip route vrf default direct"
        );
        assert_eq!(
            route_command(DeviceType::CiscoIos, RouteKind::Connected, "MGMT"),
            "show ip route vrf MGMT connected"
        );
        assert_eq!(
            route_command(DeviceType::AristaEos, RouteKind::Ospf, "default"),
            "show ip route vrf default ospf"
        );
    }
}
