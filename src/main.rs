//! shopscrape worker entry point
//!
//! Resolves configuration from the environment, connects the shared
//! database pool, then runs the worker pool over either the database
//! queue or an inline `BULK_URLS` payload. Exits 0 on any completed run,
//! including runs that matched nothing.

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shopscrape::pool::{WorkItem, WorkerPool};
use shopscrape::store::{ProductStore, QueueClient};
use shopscrape::{AppConfig, cleanup_stale_profiles};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    match cleanup_stale_profiles() {
        Ok(0) => {}
        Ok(n) => info!("cleaned {n} stale profile directories from previous runs"),
        Err(e) => warn!("stale profile sweep failed: {e:#}"),
    }

    let db_pool = match &config.database_url {
        Some(url) => Some(shopscrape::store::init_pool(url).await?),
        None => {
            warn!("DATABASE_URL not set; products will not be saved");
            None
        }
    };
    let queue = db_pool.map(|p| QueueClient::new(p.clone()));
    let store = db_pool.map(|p| ProductStore::new(p.clone()));

    let summary = if let Some(bulk) = &config.bulk_urls {
        let items: Vec<WorkItem> = bulk.iter().map(WorkItem::from).collect();
        info!("processing {} inline urls", items.len());
        let pool = WorkerPool::new(config.clone(), None, store);
        pool.run_bulk(items).await?
    } else {
        let queue = queue.ok_or_else(|| {
            anyhow::anyhow!("queue mode requires DATABASE_URL (or provide BULK_URLS)")
        })?;
        let pool = WorkerPool::new(config.clone(), Some(queue), store);
        pool.run().await?
    };

    info!(
        "run complete: {} urls, {} succeeded, {} failed, {} products found, {} saved",
        summary.urls_processed,
        summary.stats.succeeded,
        summary.stats.failed,
        summary.stats.total_products_found,
        summary.stats.total_saved_to_db
    );
    Ok(())
}
