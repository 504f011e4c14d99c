// src/ingest/providers/http.rs
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::ingest::config::HttpConfig;
use crate::ingest::error::FetchError;

/// Each adapter builds its own client from the shared settings.
pub fn build_client(cfg: &HttpConfig) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;
    Ok(client)
}

/// Unwrap a JSON response. A null or empty body is "no data" (`None`),
/// a non-2xx status or an undecodable body is a `FetchError`.
pub async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
    what: &'static str,
) -> Result<Option<T>, FetchError> {
    let status = resp.status();
    let url = resp.url().to_string();
    if !status.is_success() {
        return Err(FetchError::Status {
            url,
            status: status.as_u16(),
        });
    }

    let body = resp.text().await?;
    parse_json_body(&body, what)
}

pub fn parse_json_body<T: DeserializeOwned>(
    body: &str,
    what: &'static str,
) -> Result<Option<T>, FetchError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| FetchError::Malformed {
            what,
            message: e.to_string(),
        })
}

/// Read a text body (RSS, HTML) after checking the status.
pub async fn read_text(resp: reqwest::Response) -> Result<String, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: resp.url().to_string(),
            status: status.as_u16(),
        });
    }
    Ok(resp.text().await?)
}

pub fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}
