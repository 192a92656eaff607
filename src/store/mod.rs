//! PostgreSQL-backed stores for the URL queue and extracted products
//!
//! The connection pool is a process singleton behind a one-shot
//! initializer: the application root calls [`init_pool`] exactly once and
//! hands clones of the pool to the queue and product stores.

pub mod products;
pub mod queue;
pub mod records;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::OnceCell;
use tracing::info;

pub use products::{ProductStore, SaveContext, SaveOutcome, sanitize};
pub use queue::QueueClient;
pub use records::{ProcessingStatus, ProductRow, UrlRecord};

static DB_POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Connect the process-wide pool. Subsequent calls return the first
/// connection regardless of the URL passed.
pub async fn init_pool(database_url: &str) -> Result<&'static PgPool> {
    DB_POOL
        .get_or_try_init(|| async {
            let pool = PgPoolOptions::new()
                .max_connections(8)
                .connect(database_url)
                .await
                .context("failed to connect to database")?;
            info!("connected to product database");
            Ok::<_, anyhow::Error>(pool)
        })
        .await
}

/// The pool, if `init_pool` has completed.
pub fn pool() -> Option<&'static PgPool> {
    DB_POOL.get()
}
