// src/ingest/providers/kaggle.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::error::FetchError;
use crate::ingest::providers::http::{read_json, trim_base};
use crate::ingest::providers::record_fetch;
use crate::ingest::run_tracker::RunState;
use crate::ingest::types::{FetchBatch, Provider, RawItem, SourceAdapter, SourceType};

pub const DEFAULT_BASE_URL: &str = "https://www.kaggle.com";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KaggleTag {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KaggleCompetition {
    pub id: Option<i64>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    pub reward: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub enabled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<KaggleTag>,
}

pub struct KaggleAdapter {
    client: reqwest::Client,
    base_url: String,
    username: String,
    key: String,
    search: Option<String>,
}

impl KaggleAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        username: String,
        key: String,
        search: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            username,
            key,
            search,
        }
    }
}

#[async_trait]
impl SourceAdapter for KaggleAdapter {
    async fn fetch(&self, run: &RunState) -> Result<FetchBatch, FetchError> {
        let t0 = std::time::Instant::now();
        let url = format!("{}/api/v1/competitions/list", self.base_url);

        let mut query = vec![("page", run.page().unwrap_or(1).to_string())];
        if let Some(search) = run.query().or_else(|| self.search.clone()) {
            query.push(("search", search));
        }

        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.key))
            .query(&query)
            .send()
            .await?;

        let out: Vec<RawItem> = read_json::<Vec<KaggleCompetition>>(resp, "kaggle competitions")
            .await?
            .unwrap_or_default()
            .into_iter()
            .map(RawItem::Kaggle)
            .collect();

        record_fetch(Provider::Kaggle, t0, out.len());
        Ok(out.into())
    }

    fn provider(&self) -> Provider {
        Provider::Kaggle
    }

    fn source_type(&self) -> SourceType {
        SourceType::Api
    }
}
