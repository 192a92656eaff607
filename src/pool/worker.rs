//! One worker unit: a browser session plus the per-URL job sequence
//!
//! A job is a synchronous sequence — navigate, extract, save, ack — with
//! no cooperative suspension between its side effects. Errors never
//! propagate out of a job; they become retry/fail transitions on the URL
//! row and breaker bookkeeping.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use url::Url;

use crate::breaker::{CircuitBreaker, is_resource_exhaustion};
use crate::browser::BrowserSession;
use crate::config::BulkUrl;
use crate::extract::{ExtractionPipeline, PageOutcome};
use crate::retry::{RetryController, RetryDecision};
use crate::store::records::UrlRecord;
use crate::store::{ProductStore, QueueClient, SaveContext};

use super::stats::JobResult;

/// Unit of work dispatched to a worker, from the queue or a bulk payload.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Queue row id; `None` means an inline bulk URL with no ack path.
    pub id: Option<i64>,
    pub url: String,
    pub product_type_id: Option<i64>,
    pub searched_product_id: Option<i64>,
    /// Retries already recorded against this URL.
    pub retry_count: u32,
}

impl From<&UrlRecord> for WorkItem {
    fn from(record: &UrlRecord) -> Self {
        Self {
            id: Some(record.id),
            url: record.url.clone(),
            product_type_id: record.product_type_id,
            searched_product_id: record.searched_product_id,
            retry_count: record.retry_count.max(0) as u32,
        }
    }
}

impl From<&BulkUrl> for WorkItem {
    fn from(bulk: &BulkUrl) -> Self {
        Self {
            id: None,
            url: bulk.url.clone(),
            product_type_id: bulk.product_type_id,
            searched_product_id: bulk.searched_product_id,
            retry_count: 0,
        }
    }
}

pub struct WorkerUnit {
    index: usize,
    session: BrowserSession,
    pipeline: ExtractionPipeline,
    retry: RetryController,
    breaker: Arc<CircuitBreaker>,
    queue: Option<QueueClient>,
    store: Option<ProductStore>,
    max_items: usize,
    seen_teardown_epoch: u64,
}

impl WorkerUnit {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        session: BrowserSession,
        retry: RetryController,
        breaker: Arc<CircuitBreaker>,
        queue: Option<QueueClient>,
        store: Option<ProductStore>,
        max_items: usize,
    ) -> Self {
        let seen_teardown_epoch = breaker.teardown_epoch();
        Self {
            index,
            session,
            pipeline: ExtractionPipeline::new(),
            retry,
            breaker,
            queue,
            store,
            max_items,
            seen_teardown_epoch,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub async fn close(&mut self) {
        self.session.close().await;
    }

    /// Process one URL end to end. Always returns a result — job errors
    /// become status transitions, never panics or propagated errors.
    pub async fn run_job(&mut self, item: &WorkItem) -> JobResult {
        self.honor_global_pause().await;

        let attempt = item.retry_count + 1;
        match self.process(item).await {
            Ok((found, saved)) => {
                self.breaker.record_success();
                self.session.mark_processed();
                if let (Some(queue), Some(id)) = (&self.queue, item.id) {
                    queue
                        .ack_completed(id, attempt as i32, found as i32, saved as i32)
                        .await;
                }
                JobResult {
                    url_id: item.id,
                    url: item.url.clone(),
                    success: true,
                    products_found: found,
                    products_saved: saved,
                    attempt,
                    error: None,
                }
            }
            Err(err) => self.handle_failure(item, attempt, err).await,
        }
    }

    /// navigate → extract → save. The queue ack happens in the caller so
    /// this sequence stays side-effect-ordered per URL.
    async fn process(&mut self, item: &WorkItem) -> Result<(usize, usize)> {
        let base_url = Url::parse(&item.url)
            .with_context(|| format!("invalid url {}", item.url))?;

        let page = self.session.navigate(&item.url).await?;
        let outcome = self.pipeline.extract(&base_url, &page, self.max_items)?;

        if outcome == PageOutcome::NoResults {
            info!("[w{}] no results page: {}", self.index, item.url);
            return Ok((0, 0));
        }

        let candidates = outcome.candidates();
        let saved = match &self.store {
            Some(store) if !candidates.is_empty() => {
                let ctx = SaveContext {
                    platform_url: item.url.clone(),
                    product_type_id: item.product_type_id,
                    searched_product_id: item.searched_product_id,
                };
                let save = store.save(candidates, &ctx).await;
                if save.failed > 0 {
                    warn!("[w{}] {} product rows failed to save", self.index, save.failed);
                }
                save.saved
            }
            _ => 0,
        };
        Ok((candidates.len(), saved))
    }

    async fn handle_failure(&mut self, item: &WorkItem, attempt: u32, err: anyhow::Error) -> JobResult {
        let message = format!("{err:#}");
        warn!("[w{}] attempt {attempt} failed for {}: {message}", self.index, item.url);

        // Any failed job leaves the session in an unknown state.
        self.session.recycle().await;

        if is_resource_exhaustion(&err) {
            if let Some(pause) = self.breaker.record_resource_failure() {
                warn!(
                    "[w{}] circuit breaker tripped, global pause {}s",
                    self.index,
                    pause.as_secs()
                );
            }
        } else {
            // Linear backoff before surfacing to the retry controller.
            tokio::time::sleep(RetryController::backoff(item.retry_count)).await;
        }

        match self.retry.decide(attempt) {
            RetryDecision::Retry { next_retry_count } => {
                if let (Some(queue), Some(id)) = (&self.queue, item.id) {
                    queue.ack_retrying(id, next_retry_count, &message).await;
                }
            }
            RetryDecision::Fail => {
                if let (Some(queue), Some(id)) = (&self.queue, item.id) {
                    queue.ack_failed(id, attempt as i32, &message).await;
                }
            }
        }

        JobResult {
            url_id: item.id,
            url: item.url.clone(),
            success: false,
            products_found: 0,
            products_saved: 0,
            attempt,
            error: Some(message),
        }
    }

    /// Job-entry breaker gate: during a global pause every worker tears
    /// down its browser and sleeps until the deadline; a teardown epoch
    /// bump from another worker's trip also forces a recycle.
    async fn honor_global_pause(&mut self) {
        if self.breaker.pause_remaining().is_some() {
            self.session.recycle().await;
            self.breaker.wait_until_clear().await;
        }
        let epoch = self.breaker.teardown_epoch();
        if epoch != self.seen_teardown_epoch {
            self.seen_teardown_epoch = epoch;
            self.session.recycle().await;
        }
    }
}
