// src/ingest/providers/producthunt.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::error::FetchError;
use crate::ingest::providers::http::{read_json, trim_base};
use crate::ingest::providers::record_fetch;
use crate::ingest::run_tracker::RunState;
use crate::ingest::types::{FetchBatch, Provider, RawItem, SourceAdapter, SourceType};

pub const DEFAULT_BASE_URL: &str = "https://api.producthunt.com";

const POSTS_QUERY: &str = r#"query Posts($first: Int!, $after: String) {
  posts(first: $first, after: $after, order: NEWEST) {
    edges { node { id name tagline url createdAt votesCount
      topics { edges { node { name } } } } }
    pageInfo { endCursor hasNextPage }
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<PostsData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    posts: Option<Connection<ProductHuntPost>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(default)]
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Topic {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductHuntPost {
    pub id: Option<String>,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub votes_count: Option<i64>,
    pub topics: Option<Connection<Topic>>,
}

pub struct ProductHuntAdapter {
    client: reqwest::Client,
    base_url: String,
    token: String,
    first: u32,
}

impl ProductHuntAdapter {
    pub fn new(client: reqwest::Client, base_url: &str, token: String, first: u32) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            token,
            first,
        }
    }
}

#[async_trait]
impl SourceAdapter for ProductHuntAdapter {
    async fn fetch(&self, run: &RunState) -> Result<FetchBatch, FetchError> {
        let t0 = std::time::Instant::now();
        let url = format!("{}/v2/api/graphql", self.base_url);
        let first = run.per_page().unwrap_or(self.first as i64);
        let body = serde_json::json!({
            "query": POSTS_QUERY,
            "variables": { "first": first, "after": run.cursor() },
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let Some(gql) = read_json::<GraphqlResponse>(resp, "producthunt graphql").await? else {
            record_fetch(Provider::ProductHunt, t0, 0);
            return Ok(FetchBatch::default());
        };
        if gql.data.is_none() {
            if let Some(e) = gql.errors.first() {
                return Err(FetchError::Remote(e.message.clone()));
            }
        }

        let out: Vec<RawItem> = gql
            .data
            .and_then(|d| d.posts)
            .map(|c| c.edges)
            .unwrap_or_default()
            .into_iter()
            .map(|e| RawItem::ProductHunt(e.node))
            .collect();

        record_fetch(Provider::ProductHunt, t0, out.len());
        Ok(out.into())
    }

    fn provider(&self) -> Provider {
        Provider::ProductHunt
    }

    fn source_type(&self) -> SourceType {
        SourceType::Api
    }
}
