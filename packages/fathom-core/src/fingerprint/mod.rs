//! Device fingerprinting by trial authentication.
//!
//! Candidate credentials are tried in file order against a target
//! address; the first one that both authenticates and yields a
//! recognizable platform signature wins and its id is recorded on the
//! resulting record. Exhausting every credential is not an error — the
//! device is classified `unknown` and left alone by the scrapers.

use chrono::Utc;
use std::process::Command;
use std::time::Duration;

use crate::credentials::Credential;
use crate::records::{DeviceRecord, DeviceType};
use crate::session::SshClient;

/// Per-credential connect/auth/probe budget. A slow or filtered host
/// costs at most this much per candidate credential.
const ATTEMPT_TIMEOUT_SECS: u64 = 15;

/// Bound on the reverse DNS lookup.
const DNS_TIMEOUT: Duration = Duration::from_secs(2);

/// Timestamp format stamped into `update_time` on every (re)discovery.
pub const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fingerprint one address: resolve a display hostname, then walk the
/// candidate credentials until one classifies the platform.
pub async fn fingerprint(ip: &str, credentials: &[Credential]) -> DeviceRecord {
    let hostname = reverse_dns(ip).await;
    let ip_owned = ip.to_string();

    fingerprint_with(ip, hostname, credentials, move |credential| {
        let ip = ip_owned.clone();
        async move { autodetect(&ip, &credential).await }
    })
    .await
}

/// Credential-iteration core, generic over the per-credential probe so
/// the termination and ordering guarantees are testable without a
/// device: at most one attempt per credential, stop at the first
/// non-unknown classification.
pub(crate) async fn fingerprint_with<F, Fut>(
    ip: &str,
    hostname: String,
    credentials: &[Credential],
    mut attempt: F,
) -> DeviceRecord
where
    F: FnMut(Credential) -> Fut,
    Fut: std::future::Future<Output = DeviceType>,
{
    let mut record = DeviceRecord {
        ip: ip.to_string(),
        hostname,
        credential_id: 0,
        device_type: DeviceType::Unknown,
        update_time: Utc::now().format(UPDATE_TIME_FORMAT).to_string(),
        storage_id: None,
    };

    for credential in credentials {
        let detected = attempt(credential.clone()).await;
        if detected != DeviceType::Unknown {
            record.credential_id = credential.id;
            record.device_type = detected;
            tracing::info!(
                "{}: classified as {} with credential {}",
                ip,
                detected,
                credential.id
            );
            return record;
        }
        tracing::debug!("{}: credential {} did not classify the device", ip, credential.id);
    }

    tracing::info!("{}: no credential classified the device, recording as unknown", ip);
    record
}

/// One trial authentication + platform probe. Every failure mode —
/// connect timeout, auth rejection, unrecognized output — collapses to
/// `Unknown` so the caller just moves to the next credential.
async fn autodetect(ip: &str, credential: &Credential) -> DeviceType {
    let client = SshClient::new(ip, &credential.username, &credential.password)
        .with_timeout(ATTEMPT_TIMEOUT_SECS);

    let session = match client.connect().await {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!("{}: ssh attempt with credential {} failed: {}", ip, credential.id, e);
            return DeviceType::Unknown;
        }
    };

    // Switch families and PAN-OS answer `show version` / `show system
    // info`; a Linux box errors on both and answers uname.
    if let Ok(output) = session.exec("show version").await {
        let detected = classify_show_version(&output.stdout);
        if detected != DeviceType::Unknown {
            return detected;
        }
    }

    if let Ok(output) = session.exec("show system info").await {
        if is_panos_system_info(&output.stdout) {
            return DeviceType::PaloaltoPanos;
        }
    }

    if let Ok(output) = session.exec("uname -s").await {
        if output.stdout.trim().starts_with("Linux") {
            return DeviceType::Linux;
        }
    }

    DeviceType::Unknown
}

/// Classify a `show version` payload by its platform signature.
/// Order matters: NX-OS banners also contain the word "Cisco".
pub(crate) fn classify_show_version(output: &str) -> DeviceType {
    if output.contains("NX-OS") || output.contains("Nexus") {
        DeviceType::CiscoNxos
    } else if output.contains("Arista") || output.contains("vEOS") {
        DeviceType::AristaEos
    } else if output.contains("Cisco IOS Software")
        || output.contains("IOS (tm)")
        || output.contains("IOS-XE")
    {
        DeviceType::CiscoIos
    } else {
        DeviceType::Unknown
    }
}

/// PAN-OS `show system info` carries a `sw-version:` field.
pub(crate) fn is_panos_system_info(output: &str) -> bool {
    output.contains("sw-version:")
}

/// Resolve a display hostname for the address, falling back to the
/// address string itself when nothing resolves in time.
pub async fn reverse_dns(ip: &str) -> String {
    let ip_owned = ip.to_string();
    let lookup = tokio::task::spawn_blocking(move || reverse_dns_blocking(&ip_owned));

    match tokio::time::timeout(DNS_TIMEOUT, lookup).await {
        Ok(Ok(Some(hostname))) => hostname,
        _ => ip.to_string(),
    }
}

/// System resolver lookup: `getent hosts` first, `host` as fallback —
/// both honor /etc/hosts and the local resolver configuration.
fn reverse_dns_blocking(ip: &str) -> Option<String> {
    if let Ok(output) = Command::new("getent").args(["hosts", ip]).output() {
        if output.status.success() {
            let out = String::from_utf8_lossy(&output.stdout);
            if let Some(hostname) = out.split_whitespace().nth(1) {
                if !hostname.is_empty() {
                    return Some(hostname.to_string());
                }
            }
        }
    }

    if let Ok(output) = Command::new("host").arg(ip).output() {
        if output.status.success() {
            let out = String::from_utf8_lossy(&output.stdout);
            if let Some(hostname) = out.split("pointer").nth(1) {
                let hostname = hostname.trim().trim_end_matches('.');
                if !hostname.is_empty() {
                    return Some(hostname.to_string());
                }
            }
        }
    }

    None
}
