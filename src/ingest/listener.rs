// src/ingest/listener.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

use crate::ingest::orchestrator::{JobPhase, JobReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleKind {
    Starting,
    Completed,
    Failed,
}

impl LifecycleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleKind::Starting => "starting",
            LifecycleKind::Completed => "completed",
            LifecycleKind::Failed => "failed",
        }
    }
}

/// Start/end notification of one job execution. `report` is only present on
/// `completed`.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    pub job_id: String,
    pub job_name: String,
    pub run_id: i64,
    pub kind: LifecycleKind,
    pub status: JobPhase,
    pub report: Option<JobReport>,
    pub error: Option<String>,
    pub ts: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait JobListener: Send + Sync {
    async fn notify(&self, ev: &LifecycleEvent) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Logs every event through `tracing`.
pub struct TracingListener;

#[async_trait::async_trait]
impl JobListener for TracingListener {
    async fn notify(&self, ev: &LifecycleEvent) -> Result<()> {
        match (ev.kind, &ev.report) {
            (LifecycleKind::Completed, Some(r)) => tracing::info!(
                target: "ingest",
                job_id = %ev.job_id,
                status = ?ev.status,
                fetched = r.fetched,
                dropped = r.dropped,
                failed_feeds = r.failed_feeds,
                accepted = r.write.accepted,
                skipped = r.write.skipped,
                failed = r.write.failed,
                "job completed"
            ),
            (LifecycleKind::Failed, _) => tracing::warn!(
                target: "ingest",
                job_id = %ev.job_id,
                status = ?ev.status,
                error = ev.error.as_deref().unwrap_or_default(),
                "job failed"
            ),
            _ => tracing::info!(
                target: "ingest",
                job_id = %ev.job_id,
                status = ?ev.status,
                "job {}", ev.kind.as_str()
            ),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Posts end-of-job summaries to a Slack incoming webhook. Start events are
/// not sent.
pub struct SlackListener {
    webhook_url: Option<String>,
    client: Client,
}

impl SlackListener {
    pub fn from_env() -> Self {
        Self {
            webhook_url: std::env::var("SLACK_WEBHOOK_URL").ok(),
            client: Client::new(),
        }
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: Some(url),
            client: Client::new(),
        }
    }

    fn message(ev: &LifecycleEvent) -> String {
        match &ev.report {
            Some(r) => format!(
                "*{}* {}: accepted {}, skipped {}, failed {}, dropped {}, failed feeds {}",
                ev.job_id,
                ev.kind.as_str(),
                r.write.accepted,
                r.write.skipped,
                r.write.failed,
                r.dropped,
                r.failed_feeds
            ),
            None => format!(
                "*{}* {}: {}",
                ev.job_id,
                ev.kind.as_str(),
                ev.error.as_deref().unwrap_or("no report")
            ),
        }
    }
}

#[async_trait::async_trait]
impl JobListener for SlackListener {
    async fn notify(&self, ev: &LifecycleEvent) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!("Slack disabled (no SLACK_WEBHOOK_URL)");
            return Ok(());
        };
        if ev.kind == LifecycleKind::Starting {
            return Ok(());
        }

        let body = serde_json::json!({ "text": Self::message(ev) });
        self.client
            .post(url)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}

/// Fans one event out to every listener. A listener error is logged and
/// never reaches the job.
#[derive(Clone, Default)]
pub struct ListenerMux {
    listeners: Vec<Arc<dyn JobListener>>,
}

impl ListenerMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: Arc<dyn JobListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Tracing always; Slack when `SLACK_WEBHOOK_URL` is set.
    pub fn from_env() -> Self {
        let mux = Self::new().with(Arc::new(TracingListener));
        if std::env::var("SLACK_WEBHOOK_URL").is_ok() {
            mux.with(Arc::new(SlackListener::from_env()))
        } else {
            mux
        }
    }

    pub async fn notify(&self, ev: &LifecycleEvent) {
        for l in &self.listeners {
            if let Err(e) = l.notify(ev).await {
                tracing::warn!(listener = l.name(), job_id = %ev.job_id, "listener failed: {e:#}");
            }
        }
    }
}
