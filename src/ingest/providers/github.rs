// src/ingest/providers/github.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::error::FetchError;
use crate::ingest::providers::http::{read_json, trim_base};
use crate::ingest::providers::record_fetch;
use crate::ingest::run_tracker::RunState;
use crate::ingest::types::{FetchBatch, Provider, RawItem, SourceAdapter, SourceType};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
const DEFAULT_PER_PAGE: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubRelease {
    pub id: u64,
    pub tag_name: Option<String>,
    pub name: Option<String>,
    pub html_url: Option<String>,
    pub body: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prerelease: bool,
    pub author: Option<GithubUser>,
    /// `owner/name`; filled in by the adapter, not part of the payload.
    #[serde(skip)]
    pub repo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubRepoRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GithubEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub actor: Option<GithubUser>,
    pub repo: Option<GithubRepoRef>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Which GitHub listing a job pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GithubFeed {
    Releases,
    Events,
}

impl GithubFeed {
    fn path(&self) -> &'static str {
        match self {
            GithubFeed::Releases => "releases",
            GithubFeed::Events => "events",
        }
    }
}

pub struct GithubAdapter {
    client: reqwest::Client,
    base_url: String,
    repos: Vec<String>,
    token: Option<String>,
    feed: GithubFeed,
}

impl GithubAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        repos: Vec<String>,
        token: Option<String>,
        feed: GithubFeed,
    ) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            repos,
            token,
            feed,
        }
    }

    async fn fetch_repo(&self, repo: &str, run: &RunState) -> Result<Vec<RawItem>, FetchError> {
        let url = format!("{}/repos/{}/{}", self.base_url, repo, self.feed.path());
        let per_page = run.per_page().unwrap_or(DEFAULT_PER_PAGE);
        let page = run.page().unwrap_or(1);

        let mut req = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&[("per_page", per_page), ("page", page)]);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        let items = match self.feed {
            GithubFeed::Releases => read_json::<Vec<GithubRelease>>(resp, "github releases")
                .await?
                .unwrap_or_default()
                .into_iter()
                .map(|mut r| {
                    r.repo = repo.to_string();
                    RawItem::GithubRelease(r)
                })
                .collect(),
            GithubFeed::Events => read_json::<Vec<GithubEvent>>(resp, "github events")
                .await?
                .unwrap_or_default()
                .into_iter()
                .map(RawItem::GithubEvent)
                .collect(),
        };
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for GithubAdapter {
    async fn fetch(&self, run: &RunState) -> Result<FetchBatch, FetchError> {
        let t0 = std::time::Instant::now();
        let mut out = Vec::new();
        for repo in &self.repos {
            let mut items = self.fetch_repo(repo, run).await?;
            tracing::debug!(repo = %repo, count = items.len(), feed = ?self.feed, "github fetched");
            out.append(&mut items);
        }

        record_fetch(Provider::Github, t0, out.len());
        Ok(out.into())
    }

    fn provider(&self) -> Provider {
        Provider::Github
    }

    fn source_type(&self) -> SourceType {
        SourceType::Api
    }
}
