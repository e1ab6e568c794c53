//! Per-device-type plugin dispatch.
//!
//! A plugin is the scraper/recorder implementation for one device
//! family. Dispatch is a closed match over [`DeviceType`] — adding a
//! family without wiring its plugin fails to compile. Looking up a type
//! with no plugin (i.e. `unknown`) yields `None` and callers log and
//! skip; a plugin that lacks a capability inherits the default method,
//! which logs at info level and does nothing.

mod firewall;
mod linux;
mod switch;

pub use firewall::FirewallPlugin;
pub use linux::LinuxPlugin;
pub use switch::SwitchPlugin;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::credentials::{Credential, CredentialStore};
use crate::records::{DeviceRecord, DeviceType};
use crate::store::DocumentStore;

/// Everything a plugin needs, passed in explicitly — plugins hold no
/// global state and open no connections of their own until invoked.
#[derive(Clone)]
pub struct PluginContext {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
}

impl PluginContext {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// Re-read the credential file and resolve the credential a record
    /// was fingerprinted with.
    pub fn credential_for(&self, record: &DeviceRecord) -> Result<Credential> {
        CredentialStore::new(&self.config.credentials_path)
            .find(record.credential_id)
            .with_context(|| format!("resolving credential for {}", record.hostname))
    }
}

/// Uniform operations every device family may support.
#[async_trait]
pub trait DevicePlugin: Send + Sync {
    /// Family label for log lines.
    fn name(&self) -> &'static str;

    /// Full detail scrape after fingerprinting: every category the
    /// family supports, persisted replace-on-refresh.
    async fn record_details(&self, ctx: &PluginContext, record: &DeviceRecord) -> Result<()>;

    /// Refresh only the interface category.
    async fn rediscover_interfaces(
        &self,
        _ctx: &PluginContext,
        record: &DeviceRecord,
    ) -> Result<()> {
        tracing::info!(
            "{}: interface rediscovery not supported for device type {}",
            record.hostname,
            record.device_type
        );
        Ok(())
    }

    /// Refresh only the VLAN category.
    async fn rediscover_vlans(&self, _ctx: &PluginContext, record: &DeviceRecord) -> Result<()> {
        tracing::info!(
            "{}: vlan rediscovery not supported for device type {}",
            record.hostname,
            record.device_type
        );
        Ok(())
    }
}

static SWITCH_PLUGIN: SwitchPlugin = SwitchPlugin;
static FIREWALL_PLUGIN: FirewallPlugin = FirewallPlugin;
static LINUX_PLUGIN: LinuxPlugin = LinuxPlugin;

/// Map a device type to its plugin. `None` means no capability exists
/// for the type and the caller should log and skip.
pub fn dispatch(device_type: DeviceType) -> Option<&'static dyn DevicePlugin> {
    match device_type {
        DeviceType::CiscoIos | DeviceType::CiscoNxos | DeviceType::AristaEos => {
            Some(&SWITCH_PLUGIN)
        }
        DeviceType::PaloaltoPanos => Some(&FIREWALL_PLUGIN),
        DeviceType::Linux => Some(&LINUX_PLUGIN),
        DeviceType::Unknown => None,
    }
}

/// Serialize category items into store documents, tagging each with the
/// owning endpoint's storage id when the record has one.
pub(crate) fn category_rows<T: Serialize>(items: &[T], record: &DeviceRecord) -> Vec<Value> {
    items
        .iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .map(|mut value| {
            if let (Some(object), Some(id)) = (value.as_object_mut(), record.storage_id.as_ref()) {
                object.insert("endpoint_id".to_string(), Value::String(id.clone()));
            }
            value
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Vlan;
    use crate::store::MemoryStore;

    fn record(device_type: DeviceType) -> DeviceRecord {
        DeviceRecord {
            ip: "10.0.0.5".to_string(),
            hostname: "sw1".to_string(),
            credential_id: 1,
            device_type,
            update_time: "2024-01-01 00:00:00".to_string(),
            storage_id: Some("doc-1".to_string()),
        }
    }

    #[test]
    fn dispatch_is_closed_over_device_types() {
        assert_eq!(dispatch(DeviceType::CiscoIos).unwrap().name(), "switch");
        assert_eq!(dispatch(DeviceType::CiscoNxos).unwrap().name(), "switch");
        assert_eq!(dispatch(DeviceType::AristaEos).unwrap().name(), "switch");
        assert_eq!(dispatch(DeviceType::PaloaltoPanos).unwrap().name(), "firewall");
        assert_eq!(dispatch(DeviceType::Linux).unwrap().name(), "linux");
        assert!(dispatch(DeviceType::Unknown).is_none());
    }

    #[tokio::test]
    async fn missing_capabilities_skip_quietly() {
        let ctx = PluginContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(AppConfig::default()),
        );

        // the linux plugin has neither interface nor vlan rediscovery
        let plugin = dispatch(DeviceType::Linux).unwrap();
        plugin
            .rediscover_interfaces(&ctx, &record(DeviceType::Linux))
            .await
            .unwrap();
        plugin
            .rediscover_vlans(&ctx, &record(DeviceType::Linux))
            .await
            .unwrap();
    }

    #[test]
    fn category_rows_carry_the_endpoint_id() {
        let vlans = vec![Vlan {
            hostname: "sw1".to_string(),
            number: "100".to_string(),
            name: "users".to_string(),
        }];

        let rows = category_rows(&vlans, &record(DeviceType::CiscoIos));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["endpoint_id"], "doc-1");
        assert_eq!(rows[0]["hostname"], "sw1");

        let mut unsaved = record(DeviceType::CiscoIos);
        unsaved.storage_id = None;
        let rows = category_rows(&vlans, &unsaved);
        assert!(rows[0].get("endpoint_id").is_none());
    }
}
