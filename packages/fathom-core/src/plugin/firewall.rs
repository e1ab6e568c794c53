//! Firewall (PAN-OS) plugin.

use anyhow::Result;
use async_trait::async_trait;

use super::{DevicePlugin, PluginContext, category_rows};
use crate::records::DeviceRecord;
use crate::scrape::PanosScraper;
use crate::store::replace_rows;

pub struct FirewallPlugin;

impl FirewallPlugin {
    async fn open_scraper(
        &self,
        ctx: &PluginContext,
        record: &DeviceRecord,
    ) -> Result<Option<PanosScraper>> {
        let credential = ctx.credential_for(record)?;

        match PanosScraper::open(record, &credential).await {
            Ok(scraper) => Ok(Some(scraper)),
            Err(e) => {
                tracing::error!("failed to open api session: {}", e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl DevicePlugin for FirewallPlugin {
    fn name(&self) -> &'static str {
        "firewall"
    }

    async fn record_details(&self, ctx: &PluginContext, record: &DeviceRecord) -> Result<()> {
        let Some(scraper) = self.open_scraper(ctx, record).await? else {
            return Ok(());
        };

        let hostname = &record.hostname;
        let indices = &ctx.config.indices;

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

        match scraper.gateways().await {
            Ok(gateways) => {
                replace_rows(
                    &*ctx.store,
                    &indices.gateways,
                    hostname,
                    &category_rows(&gateways, record),
                )
                .await?;
            }
            Err(e) => tracing::warn!("{}: gateway extraction failed: {}", hostname, e),
        }

        match scraper.zones().await {
            Ok(zones) => {
                replace_rows(&*ctx.store, &indices.zones, hostname, &category_rows(&zones, record))
                    .await?;
            }
            Err(e) => tracing::warn!("{}: zone extraction failed: {}", hostname, e),
        }

        tracing::info!("details for {} pulled", hostname);
        Ok(())
    }

    async fn rediscover_interfaces(&self, ctx: &PluginContext, record: &DeviceRecord) -> Result<()> {
        let Some(scraper) = self.open_scraper(ctx, record).await? else {
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

    // VLANs are a switch concept; the default rediscover_vlans skip
    // applies.
}
