//! Generic Linux shell plugin.
//!
//! Linux endpoints have no switch CLI to scrape; the plugin harvests
//! system identity over a plain SSH shell into the endpoint details
//! index. No interface or VLAN categories, so the default rediscover
//! skips apply.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{DevicePlugin, PluginContext};
use crate::records::DeviceRecord;
use crate::session::{SshClient, SshSession};
use crate::store::replace_rows;

pub struct LinuxPlugin;

impl LinuxPlugin {
    async fn open_shell(
        &self,
        ctx: &PluginContext,
        record: &DeviceRecord,
    ) -> Result<Option<SshSession>> {
        let credential = ctx.credential_for(record)?;

        match SshClient::new(&record.ip, &credential.username, &credential.password)
            .connect()
            .await
        {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::error!("failed to open shell session: {}", e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl DevicePlugin for LinuxPlugin {
    fn name(&self) -> &'static str {
        "linux"
    }

    async fn record_details(&self, ctx: &PluginContext, record: &DeviceRecord) -> Result<()> {
        let Some(session) = self.open_shell(ctx, record).await? else {
            return Ok(());
        };

        let mut details = Map::new();

        for (key, command) in [
            ("kernel_name", "uname -s"),
            ("kernel_release", "uname -r"),
            ("architecture", "uname -m"),
            ("system_hostname", "hostname"),
        ] {
            match session.exec(command).await {
                Ok(output) => {
                    let value = output.stdout.trim();
                    if !value.is_empty() {
                        details.insert(key.to_string(), Value::String(value.to_string()));
                    }
                }
                Err(e) => tracing::warn!("{}: `{}` failed: {}", record.hostname, command, e),
            }
        }

        if let Ok(output) = session.exec("cat /etc/os-release 2>/dev/null").await {
            for (key, value) in parse_os_release(&output.stdout) {
                details.insert(key, Value::String(value));
            }
        }

        details.insert(
            "hostname".to_string(),
            Value::String(record.hostname.clone()),
        );
        if let Some(id) = record.storage_id.as_ref() {
            details.insert("endpoint_id".to_string(), Value::String(id.clone()));
        }

        replace_rows(
            &*ctx.store,
            &ctx.config.indices.details,
            &record.hostname,
            &[Value::Object(details)],
        )
        .await?;

        tracing::info!("details for {} pulled", record.hostname);
        Ok(())
    }
}

/// The os-release fields worth keeping, lowercased, quotes stripped.
fn parse_os_release(raw: &str) -> Vec<(String, String)> {
    const KEEP: &[&str] = &["ID", "VERSION_ID", "PRETTY_NAME"];

    raw.lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| KEEP.contains(key))
        .map(|(key, value)| {
            (
                format!("os_{}", key.to_lowercase()),
                value.trim_matches('"').to_string(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_release_fields_are_filtered_and_unquoted() {
        let raw = "\
PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"
NAME=\"Debian GNU/Linux\"
VERSION_ID=\"12\"
ID=debian
HOME_URL=\"https://www.debian.org/\"";
        let fields = parse_os_release(raw);

        assert_eq!(fields.len(), 3);
        assert!(fields.contains(&("os_pretty_name".to_string(), "Debian GNU/Linux 12 (bookworm)".to_string())));
        assert!(fields.contains(&("os_id".to_string(), "debian".to_string())));
        assert!(fields.contains(&("os_version_id".to_string(), "12".to_string())));
    }

    #[test]
    fn garbage_os_release_is_empty() {
        assert!(parse_os_release("cat: /etc/os-release: No such file or directory").is_empty());
    }
}
