// src/ingest/types.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::error::FetchError;
use crate::ingest::providers::{
    codeforces::CodeforcesContest,
    devto::DevToArticle,
    github::{GithubEvent, GithubRelease},
    kaggle::KaggleCompetition,
    newsapi::NewsArticle,
    producthunt::ProductHuntPost,
    reddit::RedditPost,
    rss::FeedEntry,
    scrape::ScrapedContest,
};
use crate::ingest::run_tracker::RunState;

/// External system an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    Github,
    Reddit,
    NewsApi,
    Kaggle,
    ProductHunt,
    DevTo,
    Codeforces,
    Rss,
    Atcoder,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Github => "GITHUB",
            Provider::Reddit => "REDDIT",
            Provider::NewsApi => "NEWS_API",
            Provider::Kaggle => "KAGGLE",
            Provider::ProductHunt => "PRODUCT_HUNT",
            Provider::DevTo => "DEV_TO",
            Provider::Codeforces => "CODEFORCES",
            Provider::Rss => "RSS",
            Provider::Atcoder => "ATCODER",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Release,
    Event,
    Article,
    Post,
    Product,
    Competition,
    Contest,
}

/// Provenance category. Drives error semantics: RSS isolates per feed,
/// SCRAPE fails the whole fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Api,
    Rss,
    Scrape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Draft,
    #[default]
    Published,
}

/// Canonical ingestion unit. `(provider, external_id)` is the dedup key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollectedItem {
    pub provider: Provider,
    pub item_type: ItemType,
    pub title: String,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_type: SourceType,
    /// Left empty by adapters; the writer fills in its configured default.
    pub status: Option<ItemStatus>,
    pub external_id: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Source-native payload, one variant per wire shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    GithubRelease(GithubRelease),
    GithubEvent(GithubEvent),
    Reddit(RedditPost),
    News(NewsArticle),
    Kaggle(KaggleCompetition),
    ProductHunt(ProductHuntPost),
    DevTo(DevToArticle),
    Codeforces(CodeforcesContest),
    Feed(FeedEntry),
    Contest(ScrapedContest),
}

/// What one adapter call produced. `failed_feeds` is only ever non-zero
/// for RSS adapters, which swallow per-feed failures.
#[derive(Debug, Clone, Default)]
pub struct FetchBatch {
    pub items: Vec<RawItem>,
    pub failed_feeds: usize,
}

impl From<Vec<RawItem>> for FetchBatch {
    fn from(items: Vec<RawItem>) -> Self {
        Self {
            items,
            failed_feeds: 0,
        }
    }
}

/// Uniform fetch contract. No retries inside: a transport failure is a
/// `FetchError`, an empty/null remote body is an empty batch.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, run: &RunState) -> Result<FetchBatch, FetchError>;
    fn provider(&self) -> Provider;
    fn source_type(&self) -> SourceType;
}
