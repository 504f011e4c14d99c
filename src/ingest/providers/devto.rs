// src/ingest/providers/devto.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::error::FetchError;
use crate::ingest::providers::http::{read_json, trim_base};
use crate::ingest::providers::record_fetch;
use crate::ingest::run_tracker::RunState;
use crate::ingest::types::{FetchBatch, Provider, RawItem, SourceAdapter, SourceType};

pub const DEFAULT_BASE_URL: &str = "https://dev.to";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DevToUser {
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DevToArticle {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag_list: Vec<String>,
    pub user: Option<DevToUser>,
}

pub struct DevToAdapter {
    client: reqwest::Client,
    base_url: String,
    tag: Option<String>,
    per_page: u32,
}

impl DevToAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        tag: Option<String>,
        per_page: u32,
    ) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            tag,
            per_page,
        }
    }
}

#[async_trait]
impl SourceAdapter for DevToAdapter {
    async fn fetch(&self, run: &RunState) -> Result<FetchBatch, FetchError> {
        let t0 = std::time::Instant::now();
        let url = format!("{}/api/articles", self.base_url);

        let mut query = vec![
            (
                "per_page",
                run.per_page().unwrap_or(self.per_page as i64).to_string(),
            ),
            ("page", run.page().unwrap_or(1).to_string()),
        ];
        if let Some(tag) = run.tag().or_else(|| self.tag.clone()) {
            query.push(("tag", tag));
        }

        let resp = self.client.get(&url).query(&query).send().await?;
        let out: Vec<RawItem> = read_json::<Vec<DevToArticle>>(resp, "dev.to articles")
            .await?
            .unwrap_or_default()
            .into_iter()
            .map(RawItem::DevTo)
            .collect();

        record_fetch(Provider::DevTo, t0, out.len());
        Ok(out.into())
    }

    fn provider(&self) -> Provider {
        Provider::DevTo
    }

    fn source_type(&self) -> SourceType {
        SourceType::Api
    }
}
