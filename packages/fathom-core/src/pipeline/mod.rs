//! Discovery pipeline.
//!
//! Drives a device record through its lifecycle as a chain of queued
//! jobs: probe, fingerprint + persist, optional port scan, detail scrape
//! via plugin dispatch, category rediscoveries, and the two-phase remove
//! workflow. Stages are causally chained by enqueue; there is no lock
//! preventing two rediscoveries for one device from interleaving —
//! category-scoped delete-then-insert keeps that safe.

use anyhow::{Context, Result};
use ipnetwork::IpNetwork;
use serde_json::Value;
use std::net::IpAddr;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::fingerprint;
use crate::plugin::{self, PluginContext};
use crate::probe::{self, Liveness, PingProber};
use crate::queue::{JobQueue, Priority};
use crate::records::DeviceRecord;
use crate::store::DocumentStore;

/// Pipeline handle. Cheap to clone; every queued job closure carries a
/// clone so later stages can enqueue their successors.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    queue: JobQueue,
    config: Arc<AppConfig>,
    prober: Arc<dyn Liveness>,
}

impl Pipeline {
    pub fn new(store: Arc<dyn DocumentStore>, queue: JobQueue, config: Arc<AppConfig>) -> Self {
        Self {
            store,
            queue,
            config,
            prober: Arc::new(PingProber),
        }
    }

    /// Swap the liveness prober (tests).
    pub fn with_prober(mut self, prober: Arc<dyn Liveness>) -> Self {
        self.prober = prober;
        self
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    fn plugin_context(&self) -> PluginContext {
        PluginContext::new(self.store.clone(), self.config.clone())
    }

    // -----------------------------------------------------------------
    // Sweep
    // -----------------------------------------------------------------

    /// Fan a network sweep out into one job per host address. Returns
    /// the number of hosts enqueued.
    pub fn enqueue_sweep(&self, network: &str) -> Result<usize> {
        let net: IpNetwork = network
            .parse()
            .with_context(|| format!("invalid network: {}", network))?;

        let hosts = host_addresses(&net);
        tracing::info!("sweeping {} hosts in {}", hosts.len(), network);

        for ip in &hosts {
            let pipeline = self.clone();
            let ip = ip.to_string();
            let description = format!("Sweep {}", ip);
            self.queue.enqueue(Priority::Default, description, move || async move {
                pipeline.sweep_host(ip).await;
                Ok(())
            });
        }

        Ok(hosts.len())
    }

    /// Probe one address. A live host gets a fingerprint job enqueued;
    /// a dead host is terminal — nothing is recorded, nothing else runs.
    pub async fn sweep_host(&self, ip: String) {
        if !self.prober.probe(&ip).await {
            tracing::debug!("no ping response from {}", ip);
            return;
        }

        let pipeline = self.clone();
        let ip_job = ip.clone();
        let job = self.queue.enqueue(
            Priority::High,
            format!("Record device info {}", ip),
            move || async move { pipeline.record_device_info(ip_job).await },
        );
        tracing::info!("ping response from {} - starting job {}", ip, job);
    }

    // -----------------------------------------------------------------
    // Fingerprint + persist
    // -----------------------------------------------------------------

    /// Fingerprint the address and persist the base record, then chain
    /// the port-scan and detail-recording jobs.
    pub async fn record_device_info(&self, ip: String) -> Result<()> {
        let credentials = CredentialStore::new(&self.config.credentials_path).load()?;

        let mut record = fingerprint::fingerprint(&ip, &credentials).await;

        let doc = serde_json::to_value(&record)?;
        let id = self
            .store
            .insert(&self.config.indices.endpoints, &doc)
            .await?;
        record.storage_id = Some(id);

        if self.config.portscan_enabled {
            let pipeline = self.clone();
            let scan_record = record.clone();
            self.queue.enqueue(
                Priority::High,
                format!("Record port scan {}", ip),
                move || async move { pipeline.record_portscan(scan_record).await },
            );
        }

        match plugin::dispatch(record.device_type) {
            Some(_) => {
                tracing::info!("device_type for {} discovered: {}", ip, record.device_type);
                let pipeline = self.clone();
                let detail_record = record.clone();
                self.queue.enqueue(
                    Priority::High,
                    format!("Record {} info {}", record.device_type, ip),
                    move || async move {
                        let ctx = pipeline.plugin_context();
                        match plugin::dispatch(detail_record.device_type) {
                            Some(plugin) => plugin.record_details(&ctx, &detail_record).await,
                            None => Ok(()),
                        }
                    },
                );
            }
            None => {
                tracing::info!("unable to determine credentials and device_type for {}", ip);
            }
        }

        Ok(())
    }

    /// Scan the record's address and append a fresh timestamped scan
    /// document. Prior scans are kept for historical comparison.
    pub async fn record_portscan(&self, record: DeviceRecord) -> Result<()> {
        let scan =
            probe::port_scan(&record.ip, &self.config.scan_ports, Some(&record.hostname)).await;

        let mut doc = serde_json::to_value(&scan)?;
        if let (Some(object), Some(id)) = (doc.as_object_mut(), record.storage_id.as_ref()) {
            object.insert("endpoint_id".to_string(), Value::String(id.clone()));
        }

        self.store
            .insert(&self.config.indices.portscans, &doc)
            .await?;
        tracing::info!("port scanned device {}", record.ip);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Rediscovery
    // -----------------------------------------------------------------

    pub fn enqueue_rediscover_device_info(&self, record: DeviceRecord) {
        let pipeline = self.clone();
        let description = format!("Update device info {}", record.ip);
        self.queue.enqueue(Priority::High, description, move || async move {
            pipeline.rediscover_device_info(record).await
        });
    }

    /// Re-fingerprint an existing endpoint and update its document in
    /// place, keeping the same storage id.
    pub async fn rediscover_device_info(&self, record: DeviceRecord) -> Result<()> {
        let storage_id = record
            .storage_id
            .clone()
            .context("record has no storage id")?;

        if self.prober.probe(&record.ip).await {
            tracing::info!("ping response from {}", record.ip);
        } else {
            tracing::info!("no ping response from {}", record.ip);
        }

        let credentials = CredentialStore::new(&self.config.credentials_path).load()?;
        let fresh = fingerprint::fingerprint(&record.ip, &credentials).await;

        let updates = serde_json::to_value(&fresh)?;
        self.store
            .update(&self.config.indices.endpoints, &storage_id, &updates)
            .await?;

        if fresh.device_type == crate::records::DeviceType::Unknown {
            tracing::info!(
                "unable to determine credentials and device_type for {}",
                record.ip
            );
        } else {
            tracing::info!("device_type for {} re-discovered: {}", record.ip, fresh.device_type);
        }

        Ok(())
    }

    pub fn enqueue_rediscover_portscan(&self, record: DeviceRecord) {
        let pipeline = self.clone();
        let description = format!("Update port scan info {}", record.ip);
        self.queue.enqueue(Priority::High, description, move || async move {
            pipeline.record_portscan(record).await
        });
    }

    pub fn enqueue_rediscover_interfaces(&self, record: DeviceRecord) {
        let pipeline = self.clone();
        let description = format!("Update interface info {}", record.hostname);
        self.queue.enqueue(Priority::High, description, move || async move {
            pipeline.rediscover_interfaces(record).await
        });
    }

    /// Refresh the interface category for an endpoint via its plugin.
    /// Device types without the capability are skipped with a log line.
    pub async fn rediscover_interfaces(&self, record: DeviceRecord) -> Result<()> {
        match plugin::dispatch(record.device_type) {
            Some(plugin) => {
                let ctx = self.plugin_context();
                plugin.rediscover_interfaces(&ctx, &record).await
            }
            None => {
                tracing::info!(
                    "interface info is not supported on device type {}",
                    record.device_type
                );
                Ok(())
            }
        }
    }

    pub fn enqueue_rediscover_vlans(&self, record: DeviceRecord) {
        let pipeline = self.clone();
        let description = format!("Update vlan info {}", record.hostname);
        self.queue.enqueue(Priority::High, description, move || async move {
            pipeline.rediscover_vlans(record).await
        });
    }

    /// Refresh the VLAN category for an endpoint via its plugin.
    pub async fn rediscover_vlans(&self, record: DeviceRecord) -> Result<()> {
        match plugin::dispatch(record.device_type) {
            Some(plugin) => {
                let ctx = self.plugin_context();
                plugin.rediscover_vlans(&ctx, &record).await
            }
            None => {
                tracing::info!(
                    "vlan info is not supported on device type {}",
                    record.device_type
                );
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------

    pub fn enqueue_remove(&self, record: DeviceRecord) {
        let pipeline = self.clone();
        let description = format!("Remove endpoint {}", record.hostname);
        self.queue.enqueue(Priority::High, description, move || async move {
            pipeline.remove_endpoint(record).await
        });
    }

    /// Delete the base record, then enqueue the category cascade. A
    /// crash between the phases leaves orphaned category rows; the
    /// cascade tolerates that by deleting whatever is present, including
    /// nothing.
    pub async fn remove_endpoint(&self, record: DeviceRecord) -> Result<()> {
        if let Some(id) = record.storage_id.as_ref() {
            self.store
                .delete(&self.config.indices.endpoints, id)
                .await?;
            tracing::info!("deleted {} endpoint information", record.hostname);
        }

        let pipeline = self.clone();
        let hostname = record.hostname.clone();
        let description = format!("Delete all info for {}", record.hostname);
        self.queue.enqueue(Priority::High, description, move || async move {
            pipeline.remove_all_info(hostname).await.map(|_| ())
        });

        Ok(())
    }

    /// Remove every category row for the hostname across every category
    /// index. Safe to run repeatedly; a second pass deletes nothing and
    /// still succeeds.
    pub async fn remove_all_info(&self, hostname: String) -> Result<usize> {
        let mut total_removed = 0;

        for index in self.config.indices.categories() {
            let hits = self
                .store
                .find_by_field(index, "hostname", &hostname)
                .await?;

            for hit in &hits {
                self.store.delete(index, &hit.id).await?;
            }

            total_removed += hits.len();
        }

        tracing::info!("{} records removed for {}", total_removed, hostname);
        Ok(total_removed)
    }

    // -----------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------

    /// Fetch the base record for a hostname, with its storage id
    /// attached for the rediscover/remove workflows.
    pub async fn find_endpoint(&self, hostname: &str) -> Result<Option<DeviceRecord>> {
        let hits = self
            .store
            .find_by_field(&self.config.indices.endpoints, "hostname", hostname)
            .await?;

        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        let mut record: DeviceRecord = serde_json::from_value(hit.source.clone())
            .with_context(|| format!("malformed endpoint record for {}", hostname))?;
        record.storage_id = Some(hit.id);
        Ok(Some(record))
    }

    /// Every persisted endpoint record.
    pub async fn list_endpoints(&self) -> Result<Vec<DeviceRecord>> {
        let hits = self
            .store
            .search(&self.config.indices.endpoints, "*")
            .await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let mut record: DeviceRecord = serde_json::from_value(hit.source).ok()?;
                record.storage_id = Some(hit.id);
                Some(record)
            })
            .collect())
    }
}

/// Host addresses of a network, skipping the network and broadcast
/// addresses of IPv4 networks wider than /31.
fn host_addresses(net: &IpNetwork) -> Vec<IpAddr> {
    match net {
        IpNetwork::V4(v4) if v4.prefix() < 31 => {
            let hosts = (v4.size() as usize).saturating_sub(2);
            v4.iter().skip(1).take(hosts).map(IpAddr::V4).collect()
        }
        _ => net.iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StaticProber;
    use crate::records::DeviceType;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn pipeline_with(
        store: Arc<MemoryStore>,
        queue: JobQueue,
        alive: bool,
    ) -> Pipeline {
        Pipeline::new(store, queue, Arc::new(AppConfig::default()))
            .with_prober(Arc::new(StaticProber(alive)))
    }

    fn record(hostname: &str, storage_id: Option<&str>) -> DeviceRecord {
        DeviceRecord {
            ip: "10.0.0.5".to_string(),
            hostname: hostname.to_string(),
            credential_id: 2,
            device_type: DeviceType::CiscoIos,
            update_time: "2024-01-01 00:00:00".to_string(),
            storage_id: storage_id.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn dead_host_enqueues_nothing() {
        let queue = JobQueue::new(0, 0);
        let pipeline = pipeline_with(Arc::new(MemoryStore::new()), queue.clone(), false);

        pipeline.sweep_host("10.0.0.9".to_string()).await;

        assert!(queue.jobs().is_empty());
        assert_eq!(queue.active(), 0);
    }

    #[tokio::test]
    async fn live_host_enqueues_a_fingerprint_job() {
        let queue = JobQueue::new(0, 0);
        let pipeline = pipeline_with(Arc::new(MemoryStore::new()), queue.clone(), true);

        pipeline.sweep_host("10.0.0.5".to_string()).await;

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].description, "Record device info 10.0.0.5");
        assert_eq!(jobs[0].queue, Priority::High);
    }

    #[tokio::test]
    async fn sweep_fans_out_per_host() {
        let queue = JobQueue::new(0, 0);
        let pipeline = pipeline_with(Arc::new(MemoryStore::new()), queue.clone(), false);

        let enqueued = pipeline.enqueue_sweep("192.0.2.0/29").unwrap();
        // /29 has 6 host addresses
        assert_eq!(enqueued, 6);
        assert_eq!(queue.jobs().len(), 6);

        assert!(pipeline.enqueue_sweep("not-a-network").is_err());
    }

    #[tokio::test]
    async fn remove_cascade_is_rerunnable() {
        let store = Arc::new(MemoryStore::new());
        let queue = JobQueue::new(1, 1);
        let pipeline = pipeline_with(store.clone(), queue, false);

        for n in 0..3 {
            store
                .insert("interfaces", &json!({"hostname": "sw1", "name": format!("Gi1/0/{}", n)}))
                .await
                .unwrap();
        }
        for n in 0..2 {
            store
                .insert("vlans", &json!({"hostname": "sw1", "number": format!("{}", n)}))
                .await
                .unwrap();
        }
        // rows of an unrelated endpoint survive
        store
            .insert("vlans", &json!({"hostname": "sw2", "number": "9"}))
            .await
            .unwrap();

        let removed = pipeline.remove_all_info("sw1".to_string()).await.unwrap();
        assert_eq!(removed, 5);

        // second run deletes nothing and completes without error
        let removed = pipeline.remove_all_info("sw1".to_string()).await.unwrap();
        assert_eq!(removed, 0);

        assert_eq!(store.count("vlans"), 1);
        assert_eq!(store.count("interfaces"), 0);
    }

    #[tokio::test]
    async fn remove_endpoint_deletes_identity_then_cascades() {
        let store = Arc::new(MemoryStore::new());
        let queue = JobQueue::new(1, 1);
        let pipeline = pipeline_with(store.clone(), queue.clone(), false);

        let id = store
            .insert("endpoints", &serde_json::to_value(record("sw1", None)).unwrap())
            .await
            .unwrap();
        store
            .insert("interfaces", &json!({"hostname": "sw1", "name": "Gi1/0/1"}))
            .await
            .unwrap();

        pipeline
            .remove_endpoint(record("sw1", Some(&id)))
            .await
            .unwrap();
        queue.wait_until_idle().await;

        assert_eq!(store.count("endpoints"), 0);
        assert_eq!(store.count("interfaces"), 0);
        assert!(queue.failed().is_empty());
    }

    #[tokio::test]
    async fn find_endpoint_attaches_the_storage_id() {
        let store = Arc::new(MemoryStore::new());
        let queue = JobQueue::new(0, 0);
        let pipeline = pipeline_with(store.clone(), queue, false);

        let id = store
            .insert("endpoints", &serde_json::to_value(record("sw1", None)).unwrap())
            .await
            .unwrap();

        let found = pipeline.find_endpoint("sw1").await.unwrap().unwrap();
        assert_eq!(found.storage_id.as_deref(), Some(id.as_str()));
        assert_eq!(found.device_type, DeviceType::CiscoIos);
        assert_eq!(found.credential_id, 2);

        assert!(pipeline.find_endpoint("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_devices_skip_category_rediscovery() {
        let store = Arc::new(MemoryStore::new());
        let queue = JobQueue::new(1, 1);
        let pipeline = pipeline_with(store.clone(), queue, false);

        let mut unknown = record("mystery", Some("doc-9"));
        unknown.device_type = DeviceType::Unknown;

        // no plugin for unknown: both calls log-and-skip successfully
        pipeline.rediscover_interfaces(unknown.clone()).await.unwrap();
        pipeline.rediscover_vlans(unknown).await.unwrap();
        assert_eq!(store.count("interfaces"), 0);
    }
}
