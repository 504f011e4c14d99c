// src/ingest/error.rs
//! Pipeline error taxonomy. Only `FetchError` can fail a job; the other
//! kinds are absorbed into counters and the `WriteReport`.

use thiserror::Error;

use crate::ingest::types::Provider;

/// Source unreachable or response unusable. Fatal to the job's fetch phase.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed {what} response: {message}")]
    Malformed { what: &'static str, message: String },

    #[error("unexpected markup at {url}: {message}")]
    Markup { url: String, message: String },

    #[error("remote reported failure: {0}")]
    Remote(String),
}

/// One raw item could not be mapped to a `CollectedItem`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("{provider} item is missing required field `{field}`")]
    MissingField {
        provider: Provider,
        field: &'static str,
    },
}

/// Sink-side outcome for one item that was not created.
#[derive(Debug, Error)]
pub enum SinkError {
    /// `(provider, externalId)` already stored. Expected, counted as skipped.
    #[error("duplicate item")]
    Duplicate,

    /// Anything else (network, 4xx other than 409, 5xx). Counted as failed.
    #[error("write failed{}: {message}", fmt_status(.status))]
    Write { status: Option<u16>, message: String },
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl SinkError {
    pub fn write(message: impl Into<String>) -> Self {
        SinkError::Write {
            status: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_mentions_status_when_known() {
        let e = SinkError::Write {
            status: Some(503),
            message: "unavailable".into(),
        };
        assert_eq!(e.to_string(), "write failed (HTTP 503): unavailable");
        assert_eq!(SinkError::write("boom").to_string(), "write failed: boom");
    }

    #[test]
    fn normalization_error_names_provider_and_field() {
        let e = NormalizationError::MissingField {
            provider: Provider::Reddit,
            field: "title",
        };
        assert_eq!(e.to_string(), "REDDIT item is missing required field `title`");
    }
}
