pub mod breaker;
pub mod browser;
pub mod config;
pub mod dom;
pub mod extract;
pub mod guard;
pub mod normalize;
pub mod pool;
pub mod retry;
pub mod store;
pub mod validate;

pub use breaker::{CircuitBreaker, is_resource_exhaustion};
pub use browser::{BrowserSession, SessionConfig, SessionRegistry, cleanup_stale_profiles};
pub use config::{AppConfig, BulkUrl};
pub use dom::{DomDocument, DomNode, KuchikiDocument, ScraperDocument};
pub use extract::{Candidate, ExtractionPipeline, PageOutcome, RenderedPage};
pub use guard::{ResourceGuard, auto_worker_count};
pub use pool::{
    JobResult, LogObserver, NoOpObserver, ProgressObserver, RunStats, RunSummary, StatsSnapshot,
    WorkItem, WorkerPool,
};
pub use retry::{RetryController, RetryDecision};
pub use store::{ProductStore, QueueClient, SaveContext, SaveOutcome, UrlRecord};
