//! Run configuration
//!
//! Everything the pool, sessions and stores need for one run, resolved
//! once at startup from the environment (see `env.rs`) or built directly
//! in tests.

use crate::browser::SessionConfig;
use crate::guard::{DEFAULT_CHILD_PROC_THRESHOLD, DEFAULT_FD_THRESHOLD};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_URLS_PER_SESSION: u32 = 10;
pub const DEFAULT_MAX_ITEMS_PER_PAGE: usize = 50;
pub const DEFAULT_PAGE_WAIT_SECONDS: u64 = 12;
pub const DEFAULT_STATUS_FILTERS: &[&str] = &["pending", "retrying"];

/// One entry of an inline `BULK_URLS` payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct BulkUrl {
    pub url: String,
    #[serde(default)]
    pub product_type_id: Option<i64>,
    #[serde(default)]
    pub searched_product_id: Option<i64>,
}

impl BulkUrl {
    pub fn bare(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            product_type_id: None,
            searched_product_id: None,
        }
    }
}

/// Resolved run configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres DSN; absent means bulk mode without persistence.
    pub database_url: Option<String>,
    /// Inline URL payload; when set the queue is bypassed entirely.
    pub bulk_urls: Option<Vec<BulkUrl>>,
    /// Statuses the claim procedure may hand out.
    pub status_filters: Vec<String>,
    /// Maximum URLs per run; 0 means unlimited.
    pub url_limit: usize,
    /// Skip this many queue rows (resolved to a `min_id` cursor).
    pub url_offset: usize,
    /// Claim batch size.
    pub batch_size: usize,
    /// Worker override; `None` auto-sizes from host capacity.
    pub max_workers: Option<usize>,
    pub max_retries: u32,
    pub urls_per_session: u32,
    pub fd_threshold: usize,
    pub child_proc_threshold: usize,
    /// Process only the first N URLs of the run.
    pub dry_run_sample: Option<usize>,
    /// Stop after a single claim batch.
    pub dry_run_only: bool,
    pub max_items_per_page: usize,
    pub page_wait_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bulk_urls: None,
            status_filters: DEFAULT_STATUS_FILTERS.iter().map(|s| s.to_string()).collect(),
            url_limit: 0,
            url_offset: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            max_workers: None,
            max_retries: DEFAULT_MAX_RETRIES,
            urls_per_session: DEFAULT_URLS_PER_SESSION,
            fd_threshold: DEFAULT_FD_THRESHOLD,
            child_proc_threshold: DEFAULT_CHILD_PROC_THRESHOLD,
            dry_run_sample: None,
            dry_run_only: false,
            max_items_per_page: DEFAULT_MAX_ITEMS_PER_PAGE,
            page_wait_seconds: DEFAULT_PAGE_WAIT_SECONDS,
        }
    }
}

impl AppConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            urls_per_session: self.urls_per_session,
            wait_seconds: self.page_wait_seconds,
        }
    }

    /// Effective per-run URL ceiling: the smaller of `DB_URL_LIMIT` and
    /// `DRY_RUN_SAMPLE`, with 0/absent meaning unlimited.
    pub fn effective_limit(&self) -> Option<usize> {
        let limit = (self.url_limit > 0).then_some(self.url_limit);
        match (limit, self.dry_run_sample) {
            (Some(l), Some(s)) => Some(l.min(s)),
            (Some(l), None) => Some(l),
            (None, Some(s)) => Some(s),
            (None, None) => None,
        }
    }

    pub fn is_bulk_mode(&self) -> bool {
        self.bulk_urls.is_some()
    }
}
