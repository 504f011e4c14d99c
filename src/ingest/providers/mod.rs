// src/ingest/providers/mod.rs
pub mod codeforces;
pub mod devto;
pub mod github;
pub mod http;
pub mod kaggle;
pub mod newsapi;
pub mod producthunt;
pub mod reddit;
pub mod rss;
pub mod scrape;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use metrics::{counter, histogram};

use crate::ingest::config::{CollectorConfig, SourceConfig};
use crate::ingest::orchestrator::AdapterRegistry;
use crate::ingest::types::{Provider, SourceAdapter};

use self::github::{GithubAdapter, GithubFeed};
use self::rss::FeedSpec;

pub(crate) fn record_fetch(provider: Provider, t0: Instant, count: usize) {
    histogram!("collector_fetch_ms", "provider" => provider.as_str())
        .record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("collector_items_fetched_total", "provider" => provider.as_str())
        .increment(count as u64);
}

fn base<'a>(configured: &'a Option<String>, default: &'a str) -> &'a str {
    configured.as_deref().unwrap_or(default)
}

/// Build one adapter per enabled job. Each adapter gets its own client.
pub fn build_registry(cfg: &CollectorConfig) -> Result<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();

    for job in cfg.jobs.iter().filter(|j| j.enabled) {
        let client = http::build_client(&cfg.http)
            .with_context(|| format!("building http client for job `{}`", job.name))?;

        let adapter: Arc<dyn SourceAdapter> = match &job.source {
            SourceConfig::GithubReleases {
                repos,
                token,
                base_url,
            } => Arc::new(GithubAdapter::new(
                client,
                base(base_url, github::DEFAULT_BASE_URL),
                repos.clone(),
                token.clone(),
                GithubFeed::Releases,
            )),
            SourceConfig::GithubEvents {
                repos,
                token,
                base_url,
            } => Arc::new(GithubAdapter::new(
                client,
                base(base_url, github::DEFAULT_BASE_URL),
                repos.clone(),
                token.clone(),
                GithubFeed::Events,
            )),
            SourceConfig::Reddit {
                subreddits,
                sort,
                limit,
                base_url,
            } => Arc::new(reddit::RedditAdapter::new(
                client,
                base(base_url, reddit::DEFAULT_BASE_URL),
                subreddits.clone(),
                sort,
                *limit,
            )),
            SourceConfig::NewsApi {
                api_key,
                query,
                page_size,
                base_url,
            } => Arc::new(newsapi::NewsApiAdapter::new(
                client,
                base(base_url, newsapi::DEFAULT_BASE_URL),
                api_key.clone(),
                query,
                *page_size,
            )),
            SourceConfig::Kaggle {
                username,
                key,
                search,
                base_url,
            } => Arc::new(kaggle::KaggleAdapter::new(
                client,
                base(base_url, kaggle::DEFAULT_BASE_URL),
                username.clone(),
                key.clone(),
                search.clone(),
            )),
            SourceConfig::ProductHunt {
                token,
                first,
                base_url,
            } => Arc::new(producthunt::ProductHuntAdapter::new(
                client,
                base(base_url, producthunt::DEFAULT_BASE_URL),
                token.clone(),
                *first,
            )),
            SourceConfig::DevTo {
                tag,
                per_page,
                base_url,
            } => Arc::new(devto::DevToAdapter::new(
                client,
                base(base_url, devto::DEFAULT_BASE_URL),
                tag.clone(),
                *per_page,
            )),
            SourceConfig::Codeforces { gym, base_url } => Arc::new(
                codeforces::CodeforcesAdapter::new(
                    client,
                    base(base_url, codeforces::DEFAULT_BASE_URL),
                    *gym,
                ),
            ),
            SourceConfig::Rss { feeds } => Arc::new(rss::RssAdapter::new(
                client,
                feeds
                    .iter()
                    .map(|f| FeedSpec::url(&f.name, &f.url))
                    .collect(),
            )),
            SourceConfig::Atcoder { base_url } => Arc::new(scrape::ContestScrapeAdapter::new(
                client,
                base(base_url, scrape::DEFAULT_BASE_URL),
            )),
        };

        tracing::debug!(job = %job.name, provider = %adapter.provider(), "adapter registered");
        registry.register_with_defaults(&job.name, adapter, job.params.clone());
    }

    Ok(registry)
}
