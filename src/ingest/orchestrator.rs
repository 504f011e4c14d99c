// src/ingest/orchestrator.rs
//! One job execution as a linear pipeline:
//! `STARTED -> FETCHING -> NORMALIZING -> WRITING -> COMPLETED`.
//!
//! Only a fetch error ends in `FAILED`. Normalization drops and write
//! failures degrade into counts on the `JobReport`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, gauge};
use serde::Serialize;
use thiserror::Error;

use crate::ingest::ensure_metrics_described;
use crate::ingest::error::FetchError;
use crate::ingest::listener::{LifecycleEvent, LifecycleKind, ListenerMux};
use crate::ingest::normalize::normalize_at;
use crate::ingest::run_tracker::{next_run_state, JobParameters, RunState};
use crate::ingest::types::{ItemStatus, SourceAdapter};
use crate::ingest::writer::{DedupWriter, IngestSink, WriteReport, WriterConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    Started,
    Fetching,
    Normalizing,
    Writing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job_name: String,
    pub run_id: i64,
    pub fetched: usize,
    /// Raw items that failed normalization.
    pub dropped: usize,
    pub failed_feeds: usize,
    pub write: WriteReport,
}

#[derive(Debug)]
pub enum JobOutcome {
    Completed {
        run: RunState,
        report: JobReport,
        phases: Vec<JobPhase>,
    },
    Failed {
        run: RunState,
        error: FetchError,
        phases: Vec<JobPhase>,
    },
}

impl JobOutcome {
    pub fn run(&self) -> &RunState {
        match self {
            JobOutcome::Completed { run, .. } | JobOutcome::Failed { run, .. } => run,
        }
    }

    /// Phases entered, in order.
    pub fn phases(&self) -> &[JobPhase] {
        match self {
            JobOutcome::Completed { phases, .. } | JobOutcome::Failed { phases, .. } => phases,
        }
    }

    pub fn report(&self) -> Option<&JobReport> {
        match self {
            JobOutcome::Completed { report, .. } => Some(report),
            JobOutcome::Failed { .. } => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

#[derive(Debug, Error)]
#[error("no adapter registered for job `{0}`")]
pub struct UnknownJob(pub String);

struct RegisteredJob {
    adapter: Arc<dyn SourceAdapter>,
    defaults: JobParameters,
}

/// Job name → adapter, built once at startup and handed to the orchestrator.
#[derive(Default)]
pub struct AdapterRegistry {
    jobs: BTreeMap<String, RegisteredJob>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job_name: &str, adapter: Arc<dyn SourceAdapter>) {
        self.register_with_defaults(job_name, adapter, JobParameters::new());
    }

    /// `defaults` are merged under caller-supplied parameters on every run.
    pub fn register_with_defaults(
        &mut self,
        job_name: &str,
        adapter: Arc<dyn SourceAdapter>,
        defaults: JobParameters,
    ) {
        self.jobs
            .insert(job_name.to_string(), RegisteredJob { adapter, defaults });
    }

    pub fn adapter(&self, job_name: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.jobs.get(job_name).map(|j| j.adapter.clone())
    }

    pub fn job_names(&self) -> Vec<String> {
        self.jobs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

pub struct Orchestrator {
    registry: AdapterRegistry,
    sink: Arc<dyn IngestSink>,
    listeners: ListenerMux,
    default_status: ItemStatus,
}

impl Orchestrator {
    pub fn new(
        registry: AdapterRegistry,
        sink: Arc<dyn IngestSink>,
        listeners: ListenerMux,
    ) -> Self {
        Self {
            registry,
            sink,
            listeners,
            default_status: ItemStatus::default(),
        }
    }

    pub fn with_default_status(mut self, status: ItemStatus) -> Self {
        self.default_status = status;
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Run `job_name` once. `prior` are the previous run's parameters (if
    /// any), `supplied` the externally provided overrides.
    pub async fn run_job(
        &self,
        job_name: &str,
        prior: Option<&JobParameters>,
        supplied: &JobParameters,
    ) -> Result<JobOutcome, UnknownJob> {
        let job = self
            .registry
            .jobs
            .get(job_name)
            .ok_or_else(|| UnknownJob(job_name.to_string()))?;
        ensure_metrics_described();

        let mut phases = vec![JobPhase::Started];
        let run = next_run_state(job_name, prior, &job.defaults.clone().merged_with(supplied));
        self.emit(&run, LifecycleKind::Starting, JobPhase::Started, None, None)
            .await;

        phases.push(JobPhase::Fetching);
        let batch = match job.adapter.fetch(&run).await {
            Ok(b) => b,
            Err(error) => {
                phases.push(JobPhase::Failed);
                counter!("collector_job_failures_total").increment(1);
                self.emit(
                    &run,
                    LifecycleKind::Failed,
                    JobPhase::Failed,
                    None,
                    Some(error.to_string()),
                )
                .await;
                return Ok(JobOutcome::Failed { run, error, phases });
            }
        };

        phases.push(JobPhase::Normalizing);
        let provider = job.adapter.provider();
        let fetched = batch.items.len();
        let fetched_at = Utc::now();
        let mut items = Vec::with_capacity(fetched);
        let mut dropped = 0usize;
        for raw in &batch.items {
            match normalize_at(raw, provider, fetched_at) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::debug!(job = job_name, error = %e, "item dropped");
                    dropped += 1;
                }
            }
        }
        counter!("collector_items_dropped_total").increment(dropped as u64);

        phases.push(JobPhase::Writing);
        let writer = DedupWriter::new(
            self.sink.as_ref(),
            WriterConfig {
                source_type: job.adapter.source_type(),
                job_name: job_name.to_string(),
                default_status: self.default_status,
            },
        );
        let write = writer.write(items).await;

        phases.push(JobPhase::Completed);
        let report = JobReport {
            job_name: job_name.to_string(),
            run_id: run.run_id,
            fetched,
            dropped,
            failed_feeds: batch.failed_feeds,
            write,
        };
        gauge!("collector_last_run_ts").set(Utc::now().timestamp() as f64);
        self.emit(
            &run,
            LifecycleKind::Completed,
            JobPhase::Completed,
            Some(report.clone()),
            None,
        )
        .await;

        Ok(JobOutcome::Completed {
            run,
            report,
            phases,
        })
    }

    async fn emit(
        &self,
        run: &RunState,
        kind: LifecycleKind,
        status: JobPhase,
        report: Option<JobReport>,
        error: Option<String>,
    ) {
        let ev = LifecycleEvent {
            job_id: format!("{}#{}", run.job_name, run.run_id),
            job_name: run.job_name.clone(),
            run_id: run.run_id,
            kind,
            status,
            report,
            error,
            ts: Utc::now(),
        };
        self.listeners.notify(&ev).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{FetchBatch, Provider, RawItem, SourceType};
    use crate::ingest::writer::InMemorySink;
    use async_trait::async_trait;

    struct Fixed(Vec<RawItem>);

    #[async_trait]
    impl SourceAdapter for Fixed {
        async fn fetch(&self, _run: &RunState) -> Result<FetchBatch, FetchError> {
            Ok(self.0.clone().into())
        }
        fn provider(&self) -> Provider {
            Provider::Reddit
        }
        fn source_type(&self) -> SourceType {
            SourceType::Api
        }
    }

    fn post(id: &str) -> RawItem {
        RawItem::Reddit(
            serde_json::from_value(serde_json::json!({ "id": id, "title": "Show r/rust" }))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn blank_external_ids_are_dropped_not_failed() {
        let mut reg = AdapterRegistry::new();
        reg.register("reddit", Arc::new(Fixed(vec![post("  "), post("1f00aa")])));
        let sink = Arc::new(InMemorySink::new());
        let orch = Orchestrator::new(reg, sink.clone(), ListenerMux::new());

        let outcome = orch.run_job("reddit", None, &JobParameters::new()).await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.dropped, 1);
        assert_eq!((report.write.accepted, report.write.failed), (1, 0));
        assert_eq!(sink.stored().len(), 1);
    }
}
