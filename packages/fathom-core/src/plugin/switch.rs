//! Switch-family plugin (IOS, NX-OS, EOS).

use anyhow::Result;
use async_trait::async_trait;

use super::{DevicePlugin, PluginContext, category_rows};
use crate::records::{DeviceRecord, RouteEntry, RouteKind};
use crate::scrape::SwitchScraper;
use crate::store::replace_rows;

pub struct SwitchPlugin;

impl SwitchPlugin {
    /// Open a CLI session for the record. A transport/auth/enable
    /// failure here is logged and ends the job successfully — the base
    /// record stays persisted, the device just has no details yet.
    async fn open_scraper(
        &self,
        ctx: &PluginContext,
        record: &DeviceRecord,
    ) -> Result<Option<SwitchScraper>> {
        let credential = ctx.credential_for(record)?;

        match SwitchScraper::open(record, &credential).await {
            Ok(scraper) => Ok(Some(scraper)),
            Err(e) => {
                tracing::error!("failed to open cli session: {}", e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl DevicePlugin for SwitchPlugin {
    fn name(&self) -> &'static str {
        "switch"
    }

    async fn record_details(&self, ctx: &PluginContext, record: &DeviceRecord) -> Result<()> {
        let Some(mut scraper) = self.open_scraper(ctx, record).await? else {
            return Ok(());
        };

        let hostname = &record.hostname;
        let indices = &ctx.config.indices;

        // Each category is attempted independently: one failed or
        // unrecognized extraction is logged and the rest still run, so a
        // partial inventory beats none.
        match scraper.vlans().await {
            Ok(vlans) => {
                replace_rows(&*ctx.store, &indices.vlans, hostname, &category_rows(&vlans, record))
                    .await?;
            }
            Err(e) => tracing::warn!("{}: vlan extraction failed: {}", hostname, e),
        }

        match scraper.interfaces().await {
            Ok(interfaces) => {
                replace_rows(
                    &*ctx.store,
                    &indices.interfaces,
                    hostname,
                    &category_rows(&interfaces, record),
                )
                .await?;
            }
            Err(e) => tracing::warn!("{}: interface extraction failed: {}", hostname, e),
        }

        match scraper.vrfs().await {
            Ok(vrfs) => {
                replace_rows(&*ctx.store, &indices.vrfs, hostname, &category_rows(&vrfs, record))
                    .await?;
            }
            Err(e) => tracing::warn!("{}: vrf extraction failed: {}", hostname, e),
        }

        let mut routes: Vec<RouteEntry> = Vec::new();
        let mut any_route_slice = false;
        for kind in [RouteKind::Connected, RouteKind::Static, RouteKind::Ospf] {
            match scraper.routes(kind).await {
                Ok(entries) => {
                    any_route_slice = true;
                    routes.extend(entries);
                }
                Err(e) => tracing::warn!("{}: {} route extraction failed: {}", hostname, kind, e),
            }
        }
        // A session that produced no slice at all keeps the previous
        // rows; a slice that parsed to nothing still replaces them.
        if any_route_slice {
            replace_rows(&*ctx.store, &indices.routes, hostname, &category_rows(&routes, record))
                .await?;
        }

        match scraper.neighbors().await {
            Ok(neighbors) => {
                replace_rows(
                    &*ctx.store,
                    &indices.neighbors,
                    hostname,
                    &category_rows(&neighbors, record),
                )
                .await?;
            }
            Err(e) => tracing::warn!("{}: lldp extraction failed: {}", hostname, e),
        }

        match scraper.equipment().await {
            Ok(equipment) => {
                replace_rows(
                    &*ctx.store,
                    &indices.equipment,
                    hostname,
                    &category_rows(&equipment, record),
                )
                .await?;
            }
            Err(e) => tracing::warn!("{}: inventory extraction failed: {}", hostname, e),
        }

        match scraper.protocols().await {
            Ok(protocols) => {
                replace_rows(
                    &*ctx.store,
                    &indices.protocols,
                    hostname,
                    &category_rows(&protocols, record),
                )
                .await?;
            }
            Err(e) => tracing::warn!("{}: protocol extraction failed: {}", hostname, e),
        }

        match scraper.version_details().await {
            Ok(details) => {
                let mut rows = vec![details];
                if let (Some(object), Some(id)) =
                    (rows[0].as_object_mut(), record.storage_id.as_ref())
                {
                    object.insert("endpoint_id".to_string(), serde_json::json!(id));
                }
                replace_rows(&*ctx.store, &indices.details, hostname, &rows).await?;
            }
            Err(e) => tracing::warn!("{}: version detail extraction failed: {}", hostname, e),
        }

        tracing::info!("details for {} pulled", hostname);
        Ok(())
    }

    async fn rediscover_interfaces(&self, ctx: &PluginContext, record: &DeviceRecord) -> Result<()> {
        let Some(mut scraper) = self.open_scraper(ctx, record).await? else {
            return Ok(());
        };

        let interfaces = match scraper.interfaces().await {
            Ok(interfaces) => interfaces,
            Err(e) => {
                tracing::error!("failed to pull interfaces for {}: {}", record.hostname, e);
                return Ok(());
            }
        };

        replace_rows(
            &*ctx.store,
            &ctx.config.indices.interfaces,
            &record.hostname,
            &category_rows(&interfaces, record),
        )
        .await?;

        tracing::info!("updated interfaces for endpoint {}", record.hostname);
        Ok(())
    }

    async fn rediscover_vlans(&self, ctx: &PluginContext, record: &DeviceRecord) -> Result<()> {
        let Some(mut scraper) = self.open_scraper(ctx, record).await? else {
            return Ok(());
        };

        let vlans = match scraper.vlans().await {
            Ok(vlans) => vlans,
            Err(e) => {
                tracing::error!("failed to pull vlans for {}: {}", record.hostname, e);
                return Ok(());
            }
        };

        replace_rows(
            &*ctx.store,
            &ctx.config.indices.vlans,
            &record.hostname,
            &category_rows(&vlans, record),
        )
        .await?;

        tracing::info!("updated vlans for endpoint {}", record.hostname);
        Ok(())
    }
}
