//! Bounded TCP connect scan for open-service enrichment.

use chrono::Utc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::records::{PortScan, PortService};

/// Per-port connect window.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Ports probed concurrently per batch; keeps a wide port list from
/// opening hundreds of sockets at once against a single host.
const BATCH_SIZE: usize = 32;

/// Best-effort service identification for well-known ports.
pub fn service_name(port: u16) -> &'static str {
    match port {
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 => "smtp",
        53 => "domain",
        80 => "http",
        123 => "ntp",
        161 => "snmp",
        179 => "bgp",
        389 => "ldap",
        443 => "https",
        514 => "syslog",
        636 => "ldaps",
        830 => "netconf",
        3389 => "ms-wbt-server",
        5601 => "kibana",
        8080 => "http-alt",
        8443 => "https-alt",
        9200 => "elasticsearch",
        _ => "unknown",
    }
}

/// Scan `ports` on `ip`, returning a fresh timestamped result document.
/// Finding nothing open is a valid empty result. The whole scan is
/// bounded: each port gets one connect attempt with a hard timeout.
pub async fn port_scan(ip: &str, ports: &[u16], hostname: Option<&str>) -> PortScan {
    let mut open_ports = Vec::new();

    for batch in ports.chunks(BATCH_SIZE) {
        let probes: Vec<_> = batch
            .iter()
            .map(|&port| {
                let addr = format!("{}:{}", ip, port);
                async move {
                    match timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
                        Ok(Ok(_stream)) => Some(port),
                        _ => None,
                    }
                }
            })
            .collect();

        for port in futures::future::join_all(probes).await.into_iter().flatten() {
            open_ports.push(PortService {
                port,
                service: service_name(port).to_string(),
            });
        }
    }

    open_ports.sort_by_key(|p| p.port);

    tracing::debug!("{}: {} of {} probed ports open", ip, open_ports.len(), ports.len());

    PortScan {
        hostname: hostname.unwrap_or(ip).to_string(),
        ip: ip.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        open_ports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_table_covers_inventory_ports() {
        assert_eq!(service_name(22), "ssh");
        assert_eq!(service_name(9200), "elasticsearch");
        assert_eq!(service_name(830), "netconf");
        assert_eq!(service_name(12345), "unknown");
    }

    #[tokio::test]
    async fn open_port_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let scan = port_scan("127.0.0.1", &[port], Some("localhost")).await;
        assert_eq!(scan.hostname, "localhost");
        assert_eq!(scan.open_ports.len(), 1);
        assert_eq!(scan.open_ports[0].port, port);
    }

    #[tokio::test]
    async fn nothing_open_is_a_valid_empty_result() {
        // port 1 on localhost is almost certainly closed; a refused
        // connect must yield an empty result, not an error
        let scan = port_scan("127.0.0.1", &[1], None).await;
        assert!(scan.open_ports.is_empty());
        assert_eq!(scan.hostname, "127.0.0.1");
    }
}
