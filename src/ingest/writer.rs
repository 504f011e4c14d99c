// src/ingest/writer.rs
//! Dedup writer: push every normalized item to the sink, classify the
//! result, never abort the batch.
//!
//! The sink owns "already seen". A 409 for `(provider, externalId)` is a
//! skip, any other failure is recorded and the next item is attempted.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use metrics::counter;
use serde::Serialize;

use crate::ingest::error::SinkError;
use crate::ingest::providers::http::trim_base;
use crate::ingest::types::{CollectedItem, ItemStatus, Provider, SourceType};

/// Internal ingest API: create one item keyed by `(provider, externalId)`.
#[async_trait::async_trait]
pub trait IngestSink: Send + Sync {
    async fn create(&self, item: &CollectedItem) -> Result<(), SinkError>;
}

/// `POST {base}/items`. 200/201 → created, 409 → duplicate, anything else → failed.
pub struct HttpIngestSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIngestSink {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/items", trim_base(base_url)),
        }
    }
}

#[async_trait::async_trait]
impl IngestSink for HttpIngestSink {
    async fn create(&self, item: &CollectedItem) -> Result<(), SinkError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(item)
            .send()
            .await
            .map_err(|e| SinkError::write(e.to_string()))?;

        let status = resp.status();
        match status.as_u16() {
            200 | 201 => Ok(()),
            409 => Err(SinkError::Duplicate),
            code => {
                let body: String = resp
                    .text()
                    .await
                    .unwrap_or_default()
                    .chars()
                    .take(200)
                    .collect();
                Err(SinkError::Write {
                    status: Some(code),
                    message: if body.is_empty() {
                        status.to_string()
                    } else {
                        body
                    },
                })
            }
        }
    }
}

/// Sink held in memory. Enforces the same dedup key as the real API and can
/// be told to fail specific external ids.
#[derive(Default)]
pub struct InMemorySink {
    seen: Mutex<HashSet<(Provider, String)>>,
    stored: Mutex<Vec<CollectedItem>>,
    failing: HashSet<String>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every create for `external_id` reports a non-duplicate failure.
    pub fn failing_on(mut self, external_id: &str) -> Self {
        self.failing.insert(external_id.to_string());
        self
    }

    /// Mark an item as already present, as if written by an earlier run.
    pub fn preload(&self, provider: Provider, external_id: &str) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((provider, external_id.to_string()));
    }

    pub fn stored(&self) -> Vec<CollectedItem> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait::async_trait]
impl IngestSink for InMemorySink {
    async fn create(&self, item: &CollectedItem) -> Result<(), SinkError> {
        if self.failing.contains(&item.external_id) {
            return Err(SinkError::Write {
                status: Some(500),
                message: "simulated failure".to_string(),
            });
        }
        let key = (item.provider, item.external_id.clone());
        if !self.seen.lock().unwrap_or_else(PoisonError::into_inner).insert(key) {
            return Err(SinkError::Duplicate);
        }
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item.clone());
        Ok(())
    }
}

/// One writer for every source, parameterized instead of subclassed.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub source_type: SourceType,
    pub job_name: String,
    pub default_status: ItemStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub accepted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// External ids of failed items, for later reconciliation.
    pub failed_ids: Vec<String>,
}

impl WriteReport {
    pub fn total(&self) -> usize {
        self.accepted + self.skipped + self.failed
    }
}

pub struct DedupWriter<'a> {
    sink: &'a dyn IngestSink,
    config: WriterConfig,
}

impl<'a> DedupWriter<'a> {
    pub fn new(sink: &'a dyn IngestSink, config: WriterConfig) -> Self {
        Self { sink, config }
    }

    pub async fn write(&self, items: Vec<CollectedItem>) -> WriteReport {
        let mut report = WriteReport::default();
        let job = self.config.job_name.as_str();

        for mut item in items {
            item.status.get_or_insert(self.config.default_status);

            match self.sink.create(&item).await {
                Ok(()) => report.accepted += 1,
                Err(SinkError::Duplicate) => {
                    tracing::debug!(job, external_id = %item.external_id, "duplicate, skipped");
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        job,
                        provider = %item.provider,
                        external_id = %item.external_id,
                        error = %e,
                        "write failed"
                    );
                    report.failed += 1;
                    report.failed_ids.push(item.external_id);
                }
            }
        }

        let source_type = match self.config.source_type {
            SourceType::Api => "API",
            SourceType::Rss => "RSS",
            SourceType::Scrape => "SCRAPE",
        };
        counter!("collector_items_accepted_total", "source_type" => source_type)
            .increment(report.accepted as u64);
        counter!("collector_items_skipped_total", "source_type" => source_type)
            .increment(report.skipped as u64);
        counter!("collector_items_failed_total", "source_type" => source_type)
            .increment(report.failed as u64);

        tracing::info!(
            job,
            accepted = report.accepted,
            skipped = report.skipped,
            failed = report.failed,
            "write finished"
        );
        report
    }
}
