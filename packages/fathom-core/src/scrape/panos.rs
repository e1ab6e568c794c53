//! Firewall (PAN-OS) API scraper.
//!
//! Operational commands return XML; each command is decoded in a single
//! step into the same normalized record types the switch families
//! produce.

use crate::credentials::Credential;
use crate::records::{DeviceRecord, Gateway, Interface, Zone};
use crate::session::{PanosApi, SessionError};

const CMD_INTERFACES: &str = "<show><interface>all</interface></show>";
const CMD_GATEWAYS: &str =
    "<show><global-protect-gateway><gateway></gateway></global-protect-gateway></show>";

/// Scraper bound to one authenticated firewall API session.
pub struct PanosScraper {
    api: PanosApi,
    hostname: String,
}

impl PanosScraper {
    pub async fn open(record: &DeviceRecord, credential: &Credential) -> Result<Self, SessionError> {
        let api = PanosApi::connect(
            &record.ip,
            &credential.username,
            &credential.password,
            &record.hostname,
        )
        .await?;
        Ok(Self {
            api,
            hostname: record.hostname.clone(),
        })
    }

    pub fn new(api: PanosApi, hostname: &str) -> Self {
        Self {
            api,
            hostname: hostname.to_string(),
        }
    }

    /// Network interfaces with their addresses and zone membership.
    pub async fn interfaces(&self) -> Result<Vec<Interface>, SessionError> {
        let xml = self.api.op(CMD_INTERFACES).await?;
        Ok(parse_interfaces_xml(&xml, &self.hostname))
    }

    /// GlobalProtect VPN gateways.
    pub async fn gateways(&self) -> Result<Vec<Gateway>, SessionError> {
        let xml = self.api.op(CMD_GATEWAYS).await?;
        Ok(parse_gateways_xml(&xml, &self.hostname))
    }

    /// Security zones, derived from interface zone membership.
    pub async fn zones(&self) -> Result<Vec<Zone>, SessionError> {
        let xml = self.api.op(CMD_INTERFACES).await?;
        Ok(parse_zones_xml(&xml, &self.hostname))
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

/// Decode the `ifnet` entries of `show interface all`. The zone lands in
/// the description slot; interfaces without an assigned address report
/// `N/A`, which is not an address.
pub(crate) fn parse_interfaces_xml(xml: &str, hostname: &str) -> Vec<Interface> {
    let Ok(doc) = roxmltree::Document::parse(xml) else {
        return Vec::new();
    };

    let Some(ifnet) = doc.descendants().find(|n| n.has_tag_name("ifnet")) else {
        return Vec::new();
    };

    ifnet
        .children()
        .filter(|n| n.has_tag_name("entry"))
        .filter_map(|entry| {
            let name = child_text(&entry, "name")?;
            let zone = child_text(&entry, "zone");
            let ip = child_text(&entry, "ip").filter(|ip| ip != "N/A");

            Some(Interface {
                hostname: hostname.to_string(),
                name,
                description: zone,
                mode: None,
                addresses: ip.into_iter().collect(),
                config: Vec::new(),
            })
        })
        .collect()
}

/// Decode the gateway entries of the GlobalProtect gateway listing. A
/// firewall with no gateways configured returns an empty result set.
pub(crate) fn parse_gateways_xml(xml: &str, hostname: &str) -> Vec<Gateway> {
    let Ok(doc) = roxmltree::Document::parse(xml) else {
        return Vec::new();
    };

    doc.descendants()
        .filter(|n| n.has_tag_name("entry"))
        .filter_map(|entry| {
            entry
                .attribute("name")
                .map(|s| s.to_string())
                .or_else(|| child_text(&entry, "name"))
                .or_else(|| child_text(&entry, "gateway-name"))
        })
        .map(|name| Gateway {
            hostname: hostname.to_string(),
            name,
        })
        .collect()
}

/// Distinct zones referenced by the interface table, in first-seen
/// order.
pub(crate) fn parse_zones_xml(xml: &str, hostname: &str) -> Vec<Zone> {
    let mut seen = Vec::new();

    for interface in parse_interfaces_xml(xml, hostname) {
        if let Some(zone) = interface.description {
            if !zone.is_empty() && !seen.contains(&zone) {
                seen.push(zone);
            }
        }
    }

    seen.into_iter()
        .map(|name| Zone {
            hostname: hostname.to_string(),
            name,
        })
        .collect()
}

fn child_text(node: &roxmltree::Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IFNET_XML: &str = r#"<response status="success"><result><ifnet>
        <entry><name>ethernet1/1</name><zone>untrust</zone><ip>203.0.113.2/30</ip></entry>
        <entry><name>ethernet1/2</name><zone>trust</zone><ip>10.0.0.1/24</ip></entry>
        <entry><name>ethernet1/3</name><zone>trust</zone><ip>N/A</ip></entry>
        <entry><name>ethernet1/4</name><ip>N/A</ip></entry>
    </ifnet></result></response>"#;

    #[test]
    fn interfaces_decode_with_zone_and_address() {
        let interfaces = parse_interfaces_xml(IFNET_XML, "fw1");
        assert_eq!(interfaces.len(), 4);
        assert_eq!(interfaces[0].name, "ethernet1/1");
        assert_eq!(interfaces[0].description.as_deref(), Some("untrust"));
        assert_eq!(interfaces[0].addresses, vec!["203.0.113.2/30".to_string()]);
        // N/A is not an address
        assert!(interfaces[2].addresses.is_empty());
        assert!(interfaces[3].description.is_none());
        assert_eq!(interfaces[1].hostname, "fw1");
    }

    #[test]
    fn single_entry_payload_still_decodes() {
        let xml = r#"<response status="success"><result><ifnet>
            <entry><name>ethernet1/1</name><zone>dmz</zone><ip>192.0.2.1/24</ip></entry>
        </ifnet></result></response>"#;
        let interfaces = parse_interfaces_xml(xml, "fw1");
        assert_eq!(interfaces.len(), 1);
    }

    #[test]
    fn gateways_decode_by_entry_name() {
        let xml = r#"<response status="success"><result>
            <entry name="gp-gateway-east"/>
            <entry><gateway-name>gp-gateway-west</gateway-name></entry>
        </result></response>"#;
        let gateways = parse_gateways_xml(xml, "fw1");
        assert_eq!(gateways.len(), 2);
        assert_eq!(gateways[0].name, "gp-gateway-east");
        assert_eq!(gateways[1].name, "gp-gateway-west");
    }

    #[test]
    fn zones_are_distinct_first_seen() {
        let zones = parse_zones_xml(IFNET_XML, "fw1");
        let names: Vec<&str> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, vec!["untrust", "trust"]);
    }

    #[test]
    fn garbage_payloads_are_empty_results() {
        assert!(parse_interfaces_xml("not xml", "fw1").is_empty());
        assert!(parse_gateways_xml("<response/>", "fw1").is_empty());
        assert!(parse_zones_xml("", "fw1").is_empty());
    }
}
