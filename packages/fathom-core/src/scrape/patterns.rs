//! Precompiled patterns for show-command output.
//!
//! Grouped by family. These assume the CLI output shapes the supported
//! software trains emit; an unrecognized output version simply yields no
//! matches and the extraction degrades to an empty result.

use once_cell::sync::Lazy;
use regex::Regex;

/// A dotted-quad subnet with prefix length.
pub static RE_CIDR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}/\d{1,2}").expect("valid regex")
});

/// A bare dotted-quad, fallback when a route line omits the prefix.
pub static RE_BARE_IP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").expect("valid regex")
});

/// VLAN brief row: id then name.
pub static RE_VLAN_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)\s+(\S+)").expect("valid regex"));

// ---------------------------------------------------------------------
// Route tables
// ---------------------------------------------------------------------

/// IOS/EOS connected route:
/// 1 - subnet, 2 - egress interface
pub static RE_IOS_CONNECTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"C\s+(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}/\d{1,2}) is directly connected, (.+)")
        .expect("valid regex")
});

/// IOS/EOS static route:
/// 1 - subnet, 2 - admin distance, 3 - metric, 4 - next hop
pub static RE_IOS_STATIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"S\s+(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}/\d{1,2}).*\[(\d+)/(\d+)\] via (\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
    )
    .expect("valid regex")
});

/// IOS OSPF route line, primary or secondary:
/// 1 - head (protocol marker and, on primary lines, the subnet),
/// 2 - admin distance, 3 - metric, 4 - next hop, 5 - age, 6 - egress
pub static RE_IOS_OSPF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(.+)\[(\d+)/(\d+)\] via (.+), (.+), (.+)").expect("valid regex")
});

/// EOS OSPF route line:
/// 1 - head, 2 - subnet, 3 - admin distance, 4 - metric, 5 - next hop,
/// 6 - egress
pub static RE_EOS_OSPF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(.*)\s+(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}/\d{1,2}).*\[(\d+)/(\d+)\] via (\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}), (.+)",
    )
    .expect("valid regex")
});

/// NX-OS connected/OSPF entry, spanning the destination line and its
/// `*via` continuation:
/// 1 - subnet, 2 - next hop, 3 - egress, 4 - admin distance, 5 - metric
pub static RE_NXOS_VIA_FULL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}/\d{1,2}).*\n\s*\*via (\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}), (.+), \[(\d+)/(\d+)\],",
    )
    .expect("valid regex")
});

/// NX-OS static entry (no egress interface on the `*via` line):
/// 1 - subnet, 2 - next hop, 3 - admin distance, 4 - metric
pub static RE_NXOS_VIA_SHORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}/\d{1,2}).*\n\s*\*via (\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}), \[(\d+)/(\d+)\]",
    )
    .expect("valid regex")
});

// ---------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------

pub static RE_INV_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"NAME: "(.+?)""#).expect("valid regex"));
pub static RE_INV_DESCR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"DESCR: "(.+?)""#).expect("valid regex"));
pub static RE_INV_PID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"PID: (.+?)\s").expect("valid regex"));
pub static RE_INV_SN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"SN: (.+?)\s").expect("valid regex"));

// ---------------------------------------------------------------------
// Routing protocols
// ---------------------------------------------------------------------

/// IOS `show ip protocols`: the quoted protocol instance name.
pub static RE_IOS_PROTOCOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Routing Protocol is "(.*)""#).expect("valid regex"));

/// EOS `show ip ospf` header carrying process, router id and VRF.
pub static RE_EOS_OSPF_PROCESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"Routing Process "(.*)" with ID (\S+) VRF (\S+)"#).expect("valid regex")
});

/// IOS OSPF neighbor detail block (three lines).
pub static RE_IOS_OSPF_NEIGHBOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Neighbor (.+), interface address (.+)\n\s+In the area (.+) via interface (.+)\n\s+Neighbor priority is (.+), State is (.+?), (.+) state changes",
    )
    .expect("valid regex")
});

/// EOS OSPF neighbor detail block (three lines, VRF-qualified).
pub static RE_EOS_OSPF_NEIGHBOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Neighbor (.+), VRF (.+), interface address (.+)\n\s+In area (.+) interface (.+)\n\s+Neighbor priority is (.+), State is (.+?),",
    )
    .expect("valid regex")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_route_pattern() {
        let line = "C        10.20.30.0/24 is directly connected, Vlan100";
        let caps = RE_IOS_CONNECTED.captures(line).unwrap();
        assert_eq!(&caps[1], "10.20.30.0/24");
        assert_eq!(&caps[2], "Vlan100");
    }

    #[test]
    fn static_route_pattern() {
        let line = "S        192.168.50.0/24 [1/0] via 10.0.0.1";
        let caps = RE_IOS_STATIC.captures(line).unwrap();
        assert_eq!(&caps[1], "192.168.50.0/24");
        assert_eq!(&caps[2], "1");
        assert_eq!(&caps[3], "0");
        assert_eq!(&caps[4], "10.0.0.1");
    }

    #[test]
    fn nxos_two_line_pattern() {
        let raw = "10.1.1.0/24, ubest/mbest: 1/0, attached\n    *via 10.1.1.1, Vlan10, [0/0], 3w4d, direct\n";
        let caps = RE_NXOS_VIA_FULL.captures(raw).unwrap();
        assert_eq!(&caps[1], "10.1.1.0/24");
        assert_eq!(&caps[2], "10.1.1.1");
        assert_eq!(&caps[3], "Vlan10");
        assert_eq!(&caps[4], "0");
        assert_eq!(&caps[5], "0");
    }
}
