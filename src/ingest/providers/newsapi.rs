// src/ingest/providers/newsapi.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::error::FetchError;
use crate::ingest::providers::http::{read_json, trim_base};
use crate::ingest::providers::record_fetch;
use crate::ingest::run_tracker::{RunState, FROM_KEY};
use crate::ingest::types::{FetchBatch, Provider, RawItem, SourceAdapter, SourceType};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: Option<String>,
    message: Option<String>,
    articles: Option<Vec<NewsArticle>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewsSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub source: Option<NewsSource>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

pub struct NewsApiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    query: String,
    page_size: u32,
}

impl NewsApiAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: String,
        query: &str,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            api_key,
            query: query.to_string(),
            page_size,
        }
    }
}

#[async_trait]
impl SourceAdapter for NewsApiAdapter {
    async fn fetch(&self, run: &RunState) -> Result<FetchBatch, FetchError> {
        let t0 = std::time::Instant::now();
        let url = format!("{}/v2/everything", self.base_url);

        let mut query: Vec<(&str, String)> = vec![
            ("q", run.query().unwrap_or_else(|| self.query.clone())),
            (
                "pageSize",
                run.per_page()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| self.page_size.to_string()),
            ),
            ("page", run.page().unwrap_or(1).to_string()),
            ("sortBy", "publishedAt".to_string()),
        ];
        if let Some(from) = run.params.get_str(FROM_KEY) {
            query.push(("from", from));
        }

        let resp = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&query)
            .send()
            .await?;

        let Some(body) = read_json::<EverythingResponse>(resp, "newsapi everything").await? else {
            record_fetch(Provider::NewsApi, t0, 0);
            return Ok(FetchBatch::default());
        };
        if body.status.as_deref() == Some("error") {
            return Err(FetchError::Remote(
                body.message.unwrap_or_else(|| "newsapi error".to_string()),
            ));
        }

        let out: Vec<RawItem> = body
            .articles
            .unwrap_or_default()
            .into_iter()
            .map(RawItem::News)
            .collect();
        record_fetch(Provider::NewsApi, t0, out.len());
        Ok(out.into())
    }

    fn provider(&self) -> Provider {
        Provider::NewsApi
    }

    fn source_type(&self) -> SourceType {
        SourceType::Api
    }
}
