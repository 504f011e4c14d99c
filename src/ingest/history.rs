// src/ingest/history.rs
//! Job-run history consulted by the scheduler: last parameters per job name.
//! Last writer wins; callers guarantee serial execution per job.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::Mutex;

use crate::ingest::run_tracker::JobParameters;

#[async_trait::async_trait]
pub trait RunHistory: Send + Sync {
    async fn last_parameters(&self, job_name: &str) -> Result<Option<JobParameters>>;
    async fn record(&self, job_name: &str, params: &JobParameters) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryRunHistory {
    inner: Mutex<BTreeMap<String, JobParameters>>,
}

impl InMemoryRunHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RunHistory for InMemoryRunHistory {
    async fn last_parameters(&self, job_name: &str) -> Result<Option<JobParameters>> {
        let map = self.inner.lock().await;
        Ok(map.get(job_name).cloned())
    }

    async fn record(&self, job_name: &str, params: &JobParameters) -> Result<()> {
        let mut map = self.inner.lock().await;
        map.insert(job_name.to_string(), params.clone());
        Ok(())
    }
}

/// One JSON document `{ "<job>": { "run.id": 3, ... } }`. A missing file is
/// an empty history.
pub struct FileRunHistory {
    path: PathBuf,
}

impl FileRunHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, JobParameters>> {
        match fs::read_to_string(&self.path).await {
            Ok(s) if s.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing run history {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }
}

#[async_trait::async_trait]
impl RunHistory for FileRunHistory {
    async fn last_parameters(&self, job_name: &str) -> Result<Option<JobParameters>> {
        Ok(self.read_all().await?.remove(job_name))
    }

    async fn record(&self, job_name: &str, params: &JobParameters) -> Result<()> {
        let mut all = self.read_all().await?;
        all.insert(job_name.to_string(), params.clone());

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(&all).context("serializing run history")?;
        fs::write(&self.path, body)
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}
