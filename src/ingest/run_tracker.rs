// src/ingest/run_tracker.rs
//! Run identifiers and per-execution parameters.
//!
//! A `RunState` is built right before a job launches from the previous
//! run's parameters (only `run.id` is read from them) plus whatever the
//! caller supplies. The tracker never persists anything; the scheduler's
//! history store does.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const RUN_ID_KEY: &str = "run.id";
pub const BASE_DATE_KEY: &str = "baseDate";
pub const PAGE_KEY: &str = "page";
pub const PER_PAGE_KEY: &str = "perPage";
pub const CURSOR_KEY: &str = "cursor";
pub const SUBREDDIT_KEY: &str = "subreddit";
pub const GYM_KEY: &str = "gym";
pub const QUERY_KEY: &str = "query";
pub const TAG_KEY: &str = "tag";
pub const FROM_KEY: &str = "from";

/// A single job parameter. Strings stay strings and longs stay longs
/// through any JSON round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Long(i64),
    String(String),
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Long(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

/// Flat keyed parameter set exchanged with the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobParameters(BTreeMap<String, ParamValue>);

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Absent optional values are simply not added.
    pub fn with_opt<V: Into<ParamValue>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.insert(key, v);
        }
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Long value; numeric strings are accepted too.
    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            ParamValue::Long(v) => Some(*v),
            ParamValue::String(s) => s.trim().parse().ok(),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            ParamValue::Long(v) => Some(v.to_string()),
            ParamValue::String(s) => Some(s.clone()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merged_with(mut self, other: &JobParameters) -> Self {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
        self
    }
}

/// Immutable parameters of one job execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub job_name: String,
    pub run_id: i64,
    pub base_date: Option<String>,
    /// Source-specific keys (page, perPage, cursor, ...), verbatim.
    pub params: JobParameters,
}

impl RunState {
    pub fn page(&self) -> Option<i64> {
        self.params.get_long(PAGE_KEY)
    }

    pub fn per_page(&self) -> Option<i64> {
        self.params.get_long(PER_PAGE_KEY)
    }

    pub fn cursor(&self) -> Option<String> {
        self.params.get_str(CURSOR_KEY)
    }

    pub fn subreddit(&self) -> Option<String> {
        self.params.get_str(SUBREDDIT_KEY)
    }

    pub fn query(&self) -> Option<String> {
        self.params.get_str(QUERY_KEY)
    }

    pub fn tag(&self) -> Option<String> {
        self.params.get_str(TAG_KEY)
    }

    /// `gym` accepts `true`/`false` strings or 1/0 longs.
    pub fn gym(&self) -> Option<bool> {
        match self.params.get(GYM_KEY)? {
            ParamValue::Long(v) => Some(*v != 0),
            ParamValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
        }
    }

    /// Flat parameter set the scheduler persists for the next run.
    pub fn to_parameters(&self) -> JobParameters {
        let mut out = self.params.clone();
        out.insert(RUN_ID_KEY, self.run_id);
        if let Some(d) = &self.base_date {
            out.insert(BASE_DATE_KEY, d.as_str());
        }
        out
    }
}

/// Build the next `RunState` for `job_name`.
///
/// The previous `run.id` (0 when there is no prior run) is incremented by
/// exactly one. `baseDate` and every other supplied key are copied as-is.
pub fn next_run_state(
    job_name: &str,
    prior: Option<&JobParameters>,
    supplied: &JobParameters,
) -> RunState {
    let prior_id = prior.and_then(|p| p.get_long(RUN_ID_KEY)).unwrap_or(0);

    let mut params = JobParameters::new();
    for (k, v) in supplied.iter() {
        if k != RUN_ID_KEY && k != BASE_DATE_KEY {
            params.insert(k, v.clone());
        }
    }

    RunState {
        job_name: job_name.to_string(),
        run_id: prior_id.saturating_add(1),
        base_date: supplied.get_str(BASE_DATE_KEY),
        params,
    }
}
