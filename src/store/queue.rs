//! Claim/ack protocol against the URL queue table
//!
//! The atomic batch claim is a server-side stored procedure — the only
//! supported claim path. It row-locks up to `batch_size` rows matching the
//! status filter with `id >= min_id`, marks them `claimed` for the caller
//! and returns them; no two concurrent callers ever observe the same row.
//! Stale-claim reclamation happens inside the procedure and is opaque to
//! this client.
//!
//! Failure semantics: claim errors degrade to an empty batch (the caller
//! retries next cycle); ack errors are logged and swallowed — the reaper
//! eventually releases the row.

use log::{debug, warn};
use sqlx::PgPool;

use super::records::UrlRecord;
use crate::extract::card::truncate_chars;

/// Hard cap on `error_message` column content.
const ERROR_MESSAGE_MAX_CHARS: usize = 500;

#[derive(Clone)]
pub struct QueueClient {
    pool: PgPool,
}

impl QueueClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Atomically claim up to `batch_size` rows for `worker_id`.
    ///
    /// Returns an empty batch on any transport or procedure error.
    pub async fn claim(
        &self,
        batch_size: i64,
        worker_id: &str,
        status_filters: &[String],
        min_id: i64,
    ) -> Vec<UrlRecord> {
        let result = sqlx::query_as::<_, UrlRecord>(
            "SELECT * FROM claim_product_page_urls($1, $2, $3, $4)",
        )
        .bind(batch_size)
        .bind(worker_id)
        .bind(status_filters)
        .bind(min_id)
        .fetch_all(&self.pool)
        .await;

        match result {
            Ok(rows) => {
                debug!("claimed {} urls (batch_size={batch_size}, min_id={min_id})", rows.len());
                rows
            }
            Err(err) => {
                warn!("claim failed, returning empty batch: {err}");
                Vec::new()
            }
        }
    }

    /// Terminal success ack: `completed`, counters populated (including
    /// the attempt count), claim cleared. Idempotent — repeating it with
    /// identical fields is a no-op at the row level.
    pub async fn ack_completed(
        &self,
        id: i64,
        retry_count: i32,
        products_found: i32,
        products_saved: i32,
    ) {
        let result = sqlx::query(
            "UPDATE product_page_urls \
             SET processing_status = 'completed', success = TRUE, \
                 retry_count = $2, products_found = $3, products_saved = $4, \
                 error_message = NULL, \
                 processed_at = NOW(), updated_at = NOW(), \
                 claimed_by = NULL, claimed_at = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(products_found)
        .bind(products_saved)
        .execute(&self.pool)
        .await;
        if let Err(err) = result {
            warn!("ack(completed) for url {id} failed (reaper will reclaim): {err}");
        }
    }

    /// Terminal failure ack: `failed`, claim cleared, error recorded.
    pub async fn ack_failed(&self, id: i64, retry_count: i32, error: &str) {
        let message = truncate_chars(error, ERROR_MESSAGE_MAX_CHARS);
        let result = sqlx::query(
            "UPDATE product_page_urls \
             SET processing_status = 'failed', success = FALSE, \
                 retry_count = $2, error_message = $3, \
                 processed_at = NOW(), updated_at = NOW(), \
                 claimed_by = NULL, claimed_at = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(message)
        .execute(&self.pool)
        .await;
        if let Err(err) = result {
            warn!("ack(failed) for url {id} failed (reaper will reclaim): {err}");
        }
    }

    /// Non-terminal ack: back to `retrying` with an incremented counter so
    /// a later cycle can claim the row again.
    pub async fn ack_retrying(&self, id: i64, retry_count: i32, error: &str) {
        let message = truncate_chars(error, ERROR_MESSAGE_MAX_CHARS);
        let result = sqlx::query(
            "UPDATE product_page_urls \
             SET processing_status = 'retrying', \
                 retry_count = $2, error_message = $3, updated_at = NOW(), \
                 claimed_by = NULL, claimed_at = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(message)
        .execute(&self.pool)
        .await;
        if let Err(err) = result {
            warn!("ack(retrying) for url {id} failed (reaper will reclaim): {err}");
        }
    }

    /// Id of the row at `offset` in id order; supports skipping a queue
    /// prefix via the offset cursor.
    pub async fn id_at_offset(&self, offset: i64) -> Option<i64> {
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM product_page_urls ORDER BY id LIMIT 1 OFFSET $1",
        )
        .bind(offset)
        .fetch_optional(&self.pool)
        .await;
        match result {
            Ok(id) => id,
            Err(err) => {
                warn!("offset lookup failed, ignoring offset: {err}");
                None
            }
        }
    }
}
