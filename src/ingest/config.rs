// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::run_tracker::JobParameters;
use crate::ingest::types::ItemStatus;

const ENV_PATH: &str = "COLLECTOR_CONFIG_PATH";
const SECRET_PREFIX: &str = "env:";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub sink: SinkConfig,
    pub http: HttpConfig,
    pub schedule: ScheduleConfig,
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub base_url: String,
    /// Status stamped on items that reach the writer without one.
    pub default_status: ItemStatus,
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            default_status: ItemStatus::Published,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            connect_timeout_secs: 5,
            user_agent: concat!("devfeed-collector/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub history_path: PathBuf,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            history_path: PathBuf::from("state/run_history.json"),
        }
    }
}

fn yes() -> bool {
    true
}

/// One named job: a source plus the default parameters merged into every
/// RunState of that job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    #[serde(default = "yes")]
    pub enabled: bool,
    #[serde(default)]
    pub params: JobParameters,
    #[serde(flatten)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

fn default_sort() -> String {
    "new".to_string()
}
fn default_reddit_limit() -> u32 {
    25
}
fn default_page_size() -> u32 {
    50
}
fn default_first() -> u32 {
    20
}
fn default_per_page() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceConfig {
    GithubReleases {
        repos: Vec<String>,
        token: Option<String>,
        base_url: Option<String>,
    },
    GithubEvents {
        repos: Vec<String>,
        token: Option<String>,
        base_url: Option<String>,
    },
    Reddit {
        subreddits: Vec<String>,
        #[serde(default = "default_sort")]
        sort: String,
        #[serde(default = "default_reddit_limit")]
        limit: u32,
        base_url: Option<String>,
    },
    NewsApi {
        api_key: String,
        query: String,
        #[serde(default = "default_page_size")]
        page_size: u32,
        base_url: Option<String>,
    },
    Kaggle {
        username: String,
        key: String,
        search: Option<String>,
        base_url: Option<String>,
    },
    ProductHunt {
        token: String,
        #[serde(default = "default_first")]
        first: u32,
        base_url: Option<String>,
    },
    DevTo {
        tag: Option<String>,
        #[serde(default = "default_per_page")]
        per_page: u32,
        base_url: Option<String>,
    },
    Codeforces {
        #[serde(default)]
        gym: bool,
        base_url: Option<String>,
    },
    Rss {
        feeds: Vec<FeedConfig>,
    },
    Atcoder {
        base_url: Option<String>,
    },
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<CollectorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading collector config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut cfg = parse_config(&content, ext.as_str())?;
    resolve_secrets(&mut cfg)?;
    Ok(cfg)
}

/// Load config using env var + fallbacks:
/// 1) $COLLECTOR_CONFIG_PATH
/// 2) config/collector.toml
/// 3) config/collector.json
/// 4) built-in defaults (no jobs)
pub fn load_config_default() -> Result<CollectorConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/collector.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/collector.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(CollectorConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<CollectorConfig> {
    match hint_ext {
        "toml" => toml::from_str(s).context("parsing collector config as TOML"),
        "json" => serde_json::from_str(s).context("parsing collector config as JSON"),
        _ => {
            // No usable extension: JSON documents start with `{`.
            if s.trim_start().starts_with('{') {
                serde_json::from_str(s).context("parsing collector config as JSON")
            } else {
                toml::from_str(s).context("parsing collector config as TOML")
            }
        }
    }
}

/// `"env:NAME"` → value of `$NAME`. Anything else is returned unchanged.
pub fn resolve_secret(raw: &str) -> Result<String> {
    match raw.trim().strip_prefix(SECRET_PREFIX) {
        Some(var) => std::env::var(var).map_err(|_| anyhow!("Missing {var} env var")),
        None => Ok(raw.to_string()),
    }
}

fn resolve_opt(v: &mut Option<String>) -> Result<()> {
    if let Some(s) = v.as_mut() {
        *s = resolve_secret(s)?;
    }
    Ok(())
}

fn resolve_secrets(cfg: &mut CollectorConfig) -> Result<()> {
    // Disabled jobs may reference variables that are not set.
    for job in cfg.jobs.iter_mut().filter(|j| j.enabled) {
        let ctx = || format!("resolving secrets of job `{}`", job.name);
        match &mut job.source {
            SourceConfig::GithubReleases { token, .. }
            | SourceConfig::GithubEvents { token, .. } => resolve_opt(token).with_context(ctx)?,
            SourceConfig::NewsApi { api_key, .. } => {
                *api_key = resolve_secret(api_key).with_context(ctx)?
            }
            SourceConfig::Kaggle { username, key, .. } => {
                *username = resolve_secret(username).with_context(ctx)?;
                *key = resolve_secret(key).with_context(ctx)?;
            }
            SourceConfig::ProductHunt { token, .. } => {
                *token = resolve_secret(token).with_context(ctx)?
            }
            SourceConfig::Reddit { .. }
            | SourceConfig::DevTo { .. }
            | SourceConfig::Codeforces { .. }
            | SourceConfig::Rss { .. }
            | SourceConfig::Atcoder { .. } => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::run_tracker::PAGE_KEY;

    const TOML: &str = r#"
[sink]
base_url = "http://sink.local"
default_status = "DRAFT"

[[jobs]]
name = "rust-releases"
source = "github_releases"
repos = ["rust-lang/rust"]
params = { perPage = 10 }

[[jobs]]
name = "blogs"
source = "rss"
enabled = false
feeds = [{ name = "this-week-in-rust", url = "https://this-week-in-rust.org/rss.xml" }]
"#;

    #[test]
    fn toml_jobs_and_defaults() {
        let cfg = parse_config(TOML, "toml").unwrap();
        assert_eq!(cfg.sink.base_url, "http://sink.local");
        assert_eq!(cfg.sink.default_status, ItemStatus::Draft);
        assert_eq!(cfg.schedule.interval_secs, 3600);
        assert_eq!(cfg.jobs.len(), 2);

        let gh = &cfg.jobs[0];
        assert!(gh.enabled);
        assert_eq!(gh.params.get_long("perPage"), Some(10));
        assert!(matches!(
            &gh.source,
            SourceConfig::GithubReleases { repos, .. } if repos.len() == 1
        ));

        assert!(!cfg.jobs[1].enabled);
        assert!(matches!(&cfg.jobs[1].source, SourceConfig::Rss { feeds } if feeds.len() == 1));
    }

    #[test]
    fn json_without_extension_is_detected() {
        let json = r#"{"jobs":[{"name":"cf","source":"codeforces","gym":true,"params":{"page":2}}]}"#;
        let cfg = parse_config(json, "").unwrap();
        assert!(matches!(cfg.jobs[0].source, SourceConfig::Codeforces { gym: true, .. }));
        assert_eq!(cfg.jobs[0].params.get_long(PAGE_KEY), Some(2));
    }

    #[serial_test::serial]
    #[test]
    fn env_secrets_are_resolved() {
        std::env::set_var("DEVFEED_TEST_PH_TOKEN", "s3cret");
        let mut cfg = parse_config(
            r#"{"jobs":[{"name":"ph","source":"product_hunt","token":"env:DEVFEED_TEST_PH_TOKEN"}]}"#,
            "json",
        )
        .unwrap();
        resolve_secrets(&mut cfg).unwrap();
        assert!(matches!(
            &cfg.jobs[0].source,
            SourceConfig::ProductHunt { token, first: 20, .. } if token == "s3cret"
        ));
        std::env::remove_var("DEVFEED_TEST_PH_TOKEN");

        let mut missing = parse_config(
            r#"{"jobs":[{"name":"ph","source":"product_hunt","token":"env:DEVFEED_TEST_MISSING"}]}"#,
            "json",
        )
        .unwrap();
        assert!(resolve_secrets(&mut missing).is_err());
    }
}
