// src/ingest/providers/reddit.rs
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::error::FetchError;
use crate::ingest::providers::http::{read_json, trim_base};
use crate::ingest::providers::record_fetch;
use crate::ingest::run_tracker::RunState;
use crate::ingest::types::{FetchBatch, Provider, RawItem, SourceAdapter, SourceType};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RedditPost,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RedditPost {
    pub id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub permalink: Option<String>,
    pub selftext: Option<String>,
    pub author: Option<String>,
    pub subreddit: Option<String>,
    pub created_utc: Option<f64>,
    pub score: Option<i64>,
}

pub struct RedditAdapter {
    client: reqwest::Client,
    base_url: String,
    subreddits: Vec<String>,
    sort: String,
    limit: u32,
}

impl RedditAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        subreddits: Vec<String>,
        sort: &str,
        limit: u32,
    ) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            subreddits,
            sort: sort.to_string(),
            limit,
        }
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    async fn fetch(&self, run: &RunState) -> Result<FetchBatch, FetchError> {
        let t0 = std::time::Instant::now();

        // A `subreddit` run parameter narrows the job to that one listing.
        let subs = match run.subreddit() {
            Some(s) => vec![s],
            None => self.subreddits.clone(),
        };
        let limit = run
            .per_page()
            .map(|n| u32::try_from(n.max(1)).unwrap_or(u32::MAX))
            .unwrap_or(self.limit);

        let mut out = Vec::new();
        for sub in subs {
            let url = format!("{}/r/{}/{}.json", self.base_url, sub, self.sort);
            let mut req = self.client.get(&url).query(&[("limit", limit.to_string())]);
            if let Some(after) = run.cursor() {
                req = req.query(&[("after", after)]);
            }
            let resp = req.send().await?;
            let listing = read_json::<Listing>(resp, "reddit listing").await?;
            let posts = listing
                .and_then(|l| l.data)
                .map(|d| d.children)
                .unwrap_or_default();
            out.extend(posts.into_iter().map(|c| RawItem::Reddit(c.data)));
        }

        record_fetch(Provider::Reddit, t0, out.len());
        Ok(out.into())
    }

    fn provider(&self) -> Provider {
        Provider::Reddit
    }

    fn source_type(&self) -> SourceType {
        SourceType::Api
    }
}
