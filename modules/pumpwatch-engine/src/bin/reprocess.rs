//! Maintenance job: promote eligible pending reports.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pumpwatch_common::{Config, DveConfig};
use pumpwatch_engine::{NominatimGeocoder, ReportPipeline, SystemClock};
use pumpwatch_store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pumpwatch=info".parse()?))
        .init();

    info!("PumpWatch reprocess starting...");

    let config = Config::from_env();
    let store = Arc::new(PgStore::connect(&config.database_url).await?);
    store.migrate().await?;

    let pipeline = ReportPipeline::new(
        store,
        NominatimGeocoder::new(config.geocoder_url.clone()),
        SystemClock,
        DveConfig::default(),
    );

    let summary = pipeline.reprocess_pending().await?;
    info!(verified = summary.verified_count, "reprocess finished");

    Ok(())
}
