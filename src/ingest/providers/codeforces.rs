// src/ingest/providers/codeforces.rs
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::error::FetchError;
use crate::ingest::providers::http::{read_json, trim_base};
use crate::ingest::providers::record_fetch;
use crate::ingest::run_tracker::RunState;
use crate::ingest::types::{FetchBatch, Provider, RawItem, SourceAdapter, SourceType};

pub const DEFAULT_BASE_URL: &str = "https://codeforces.com";

#[derive(Debug, Deserialize)]
struct ContestListResponse {
    status: String,
    comment: Option<String>,
    result: Option<Vec<CodeforcesContest>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeforcesContest {
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub phase: Option<String>,
    pub duration_seconds: Option<i64>,
    pub start_time_seconds: Option<i64>,
    /// Whether the contest came from the gym listing; set by the adapter.
    #[serde(skip)]
    pub gym: bool,
}

pub struct CodeforcesAdapter {
    client: reqwest::Client,
    base_url: String,
    gym: bool,
}

impl CodeforcesAdapter {
    pub fn new(client: reqwest::Client, base_url: &str, gym: bool) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            gym,
        }
    }
}

#[async_trait]
impl SourceAdapter for CodeforcesAdapter {
    async fn fetch(&self, run: &RunState) -> Result<FetchBatch, FetchError> {
        let t0 = std::time::Instant::now();
        let url = format!("{}/api/contest.list", self.base_url);
        let gym = run.gym().unwrap_or(self.gym);

        let resp = self
            .client
            .get(&url)
            .query(&[("gym", gym.to_string())])
            .send()
            .await?;

        let Some(body) = read_json::<ContestListResponse>(resp, "codeforces contest.list").await?
        else {
            record_fetch(Provider::Codeforces, t0, 0);
            return Ok(FetchBatch::default());
        };
        if body.status != "OK" {
            return Err(FetchError::Remote(
                body.comment.unwrap_or_else(|| format!("status {}", body.status)),
            ));
        }

        let out: Vec<RawItem> = body
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|mut c| {
                c.gym = gym;
                RawItem::Codeforces(c)
            })
            .collect();

        record_fetch(Provider::Codeforces, t0, out.len());
        Ok(out.into())
    }

    fn provider(&self) -> Provider {
        Provider::Codeforces
    }

    fn source_type(&self) -> SourceType {
        SourceType::Api
    }
}
