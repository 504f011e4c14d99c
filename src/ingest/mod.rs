// src/ingest/mod.rs
pub mod config;
pub mod error;
pub mod history;
pub mod listener;
pub mod normalize;
pub mod orchestrator;
pub mod providers;
pub mod run_tracker;
pub mod scheduler;
pub mod types;
pub mod writer;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use normalize::{normalize, normalize_text};
pub use orchestrator::{AdapterRegistry, JobOutcome, JobPhase, JobReport, Orchestrator};
pub use run_tracker::{next_run_state, JobParameters, RunState};
pub use types::{CollectedItem, Provider, RawItem, SourceAdapter, SourceType};
pub use writer::{DedupWriter, IngestSink, WriteReport};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "collector_items_fetched_total",
            "Raw items returned by source adapters."
        );
        describe_counter!(
            "collector_items_dropped_total",
            "Raw items dropped because they could not be normalized."
        );
        describe_counter!(
            "collector_items_accepted_total",
            "Items created at the ingest sink."
        );
        describe_counter!(
            "collector_items_skipped_total",
            "Items the sink already had (duplicate provider + externalId)."
        );
        describe_counter!(
            "collector_items_failed_total",
            "Items the sink rejected for a non-duplicate reason."
        );
        describe_counter!(
            "collector_feed_failures_total",
            "RSS feeds that failed to load or parse."
        );
        describe_counter!(
            "collector_job_failures_total",
            "Jobs that ended in FAILED (fetch error)."
        );
        describe_counter!("collector_runs_total", "Scheduler ticks.");
        describe_histogram!("collector_fetch_ms", "Adapter fetch time in milliseconds.");
        describe_gauge!(
            "collector_last_run_ts",
            "Unix ts when a job last completed."
        );
    });
}
