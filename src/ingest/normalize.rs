// src/ingest/normalize.rs
//! Raw source payloads → `CollectedItem`.
//!
//! `external_id` is derived only from source-native keys, so the same raw
//! item always yields byte-identical ids across runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

use crate::ingest::error::NormalizationError;
use crate::ingest::types::{CollectedItem, ItemType, Provider, RawItem, SourceType};

/// Normalize text: decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

fn sha256_hex(s: &str) -> String {
    format!("{:x}", Sha256::digest(s.as_bytes()))
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn clean(s: Option<&str>) -> Option<String> {
    s.map(normalize_text).filter(|s| !s.is_empty())
}

/// Builder-ish accumulator so every arm fills the same fields.
struct Draft {
    item_type: ItemType,
    external_id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    summary: Option<String>,
    published_at: Option<DateTime<Utc>>,
    metadata: BTreeMap<String, String>,
}

impl Draft {
    fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            external_id: None,
            title: None,
            url: None,
            summary: None,
            published_at: None,
            metadata: BTreeMap::new(),
        }
    }

    fn meta(mut self, key: &str, value: Option<impl ToString>) -> Self {
        if let Some(v) = value {
            let v = v.to_string();
            if !v.is_empty() {
                self.metadata.insert(key.to_string(), v);
            }
        }
        self
    }
}

fn source_type_of(raw: &RawItem) -> SourceType {
    match raw {
        RawItem::Feed(_) => SourceType::Rss,
        RawItem::Contest(_) => SourceType::Scrape,
        _ => SourceType::Api,
    }
}

fn draft_for(raw: &RawItem) -> Draft {
    match raw {
        RawItem::GithubRelease(r) => {
            let tag = non_empty(r.tag_name.as_deref());
            let mut d = Draft::new(ItemType::Release)
                .meta("repo", Some(&r.repo))
                .meta("tag", tag.as_ref())
                .meta("author", r.author.as_ref().map(|a| &a.login))
                .meta("prerelease", Some(r.prerelease));
            d.external_id = tag.as_ref().map(|t| format!("{}@{}", r.repo, t));
            d.title = clean(r.name.as_deref()).or_else(|| tag.clone());
            d.url = non_empty(r.html_url.as_deref());
            d.summary = clean(r.body.as_deref());
            d.published_at = r.published_at;
            d
        }
        RawItem::GithubEvent(e) => {
            let repo = e.repo.as_ref().map(|r| r.name.clone());
            let mut d = Draft::new(ItemType::Event)
                .meta("repo", repo.as_ref())
                .meta("actor", e.actor.as_ref().map(|a| &a.login))
                .meta("type", e.kind.as_ref())
                .meta("action", e.payload.get("action").and_then(|v| v.as_str()))
                .meta("ref", e.payload.get("ref").and_then(|v| v.as_str()))
                .meta("commits", e.payload.get("size").and_then(|v| v.as_u64()));
            d.external_id = non_empty(e.id.as_deref());
            d.title = match (&e.kind, &repo) {
                (Some(kind), Some(repo)) => Some(format!("{kind} on {repo}")),
                (Some(kind), None) => Some(kind.clone()),
                _ => None,
            };
            d.url = repo.as_ref().map(|r| format!("https://github.com/{r}"));
            d.published_at = e.created_at;
            d
        }
        RawItem::Reddit(p) => {
            let mut d = Draft::new(ItemType::Post)
                .meta("subreddit", p.subreddit.as_ref())
                .meta("author", p.author.as_ref())
                .meta("score", p.score);
            d.external_id = non_empty(p.id.as_deref());
            d.title = clean(p.title.as_deref());
            d.url = non_empty(p.permalink.as_deref())
                .map(|pl| format!("https://www.reddit.com{pl}"))
                .or_else(|| non_empty(p.url.as_deref()));
            d.summary = clean(p.selftext.as_deref());
            d.published_at = p
                .created_utc
                .and_then(|t| DateTime::from_timestamp(t as i64, 0));
            d
        }
        RawItem::News(a) => {
            let url = non_empty(a.url.as_deref());
            let mut d = Draft::new(ItemType::Article)
                .meta("source", a.source.as_ref().and_then(|s| s.name.as_ref()))
                .meta("author", a.author.as_ref());
            d.external_id = url.as_deref().map(sha256_hex);
            d.title = clean(a.title.as_deref());
            d.url = url;
            d.summary = clean(a.description.as_deref());
            d.published_at = a.published_at;
            d
        }
        RawItem::Kaggle(c) => {
            let reference = non_empty(c.reference.as_deref());
            let tags = c
                .tags
                .iter()
                .filter_map(|t| t.name.as_deref())
                .collect::<Vec<_>>()
                .join(",");
            let mut d = Draft::new(ItemType::Competition)
                .meta("category", c.category.as_ref())
                .meta("reward", c.reward.as_ref())
                .meta("deadline", c.deadline.map(|t| t.to_rfc3339()))
                .meta("tags", Some(tags));
            d.external_id = reference.clone().or_else(|| c.id.map(|id| id.to_string()));
            d.title = clean(c.title.as_deref());
            d.url = non_empty(c.url.as_deref()).or_else(|| {
                reference.as_ref().map(|r| {
                    if r.starts_with("http") {
                        r.clone()
                    } else {
                        format!("https://www.kaggle.com/competitions/{r}")
                    }
                })
            });
            d.summary = clean(c.description.as_deref());
            d.published_at = c.enabled_date;
            d
        }
        RawItem::ProductHunt(p) => {
            let topics = p
                .topics
                .as_ref()
                .map(|c| {
                    c.edges
                        .iter()
                        .map(|e| e.node.name.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                });
            let mut d = Draft::new(ItemType::Product)
                .meta("votes", p.votes_count)
                .meta("topics", topics);
            d.external_id = non_empty(p.id.as_deref());
            d.title = clean(p.name.as_deref());
            d.url = non_empty(p.url.as_deref());
            d.summary = clean(p.tagline.as_deref());
            d.published_at = p.created_at;
            d
        }
        RawItem::DevTo(a) => {
            let mut d = Draft::new(ItemType::Article)
                .meta("tags", Some(a.tag_list.join(",")))
                .meta("author", a.user.as_ref().and_then(|u| u.username.as_ref()));
            d.external_id = a.id.map(|id| id.to_string());
            d.title = clean(a.title.as_deref());
            d.url = non_empty(a.url.as_deref());
            d.summary = clean(a.description.as_deref());
            d.published_at = a.published_at;
            d
        }
        RawItem::Codeforces(c) => {
            let mut d = Draft::new(ItemType::Contest)
                .meta("phase", c.phase.as_ref())
                .meta("type", c.kind.as_ref())
                .meta("durationSeconds", c.duration_seconds)
                .meta("gym", Some(c.gym));
            d.external_id = c.id.map(|id| id.to_string());
            d.title = clean(c.name.as_deref());
            d.url = c.id.map(|id| {
                let section = if c.gym { "gym" } else { "contest" };
                format!("https://codeforces.com/{section}/{id}")
            });
            d.published_at = c
                .start_time_seconds
                .and_then(|t| DateTime::from_timestamp(t, 0));
            d
        }
        RawItem::Feed(f) => {
            let title = clean(f.title.as_deref());
            let categories = f.categories.join(",");
            let mut d = Draft::new(ItemType::Article)
                .meta("feed", Some(&f.feed))
                .meta("author", f.author.as_ref())
                .meta("categories", Some(categories));
            // guid, then link, then a content hash of title + pubDate
            d.external_id = non_empty(f.guid.as_deref())
                .or_else(|| non_empty(f.link.as_deref()))
                .or_else(|| {
                    title.as_ref().map(|t| {
                        sha256_hex(&format!("{}|{}", t, f.pub_date.as_deref().unwrap_or_default()))
                    })
                });
            d.title = title;
            d.url = non_empty(f.link.as_deref());
            d.summary = clean(f.description.as_deref());
            d.published_at = f.published_at;
            d
        }
        RawItem::Contest(c) => {
            let mut d = Draft::new(ItemType::Contest)
                .meta("duration", c.duration.as_ref())
                .meta("ratedRange", c.rated_range.as_ref());
            d.external_id = non_empty(Some(c.slug.as_str()));
            d.title = clean(Some(c.title.as_str()));
            d.url = non_empty(Some(c.url.as_str()));
            d.published_at = c.start_time;
            d
        }
    }
}

/// Map one raw item onto the canonical model, using `fetched_at` when the
/// source supplies no publication time.
pub fn normalize_at(
    raw: &RawItem,
    provider: Provider,
    fetched_at: DateTime<Utc>,
) -> Result<CollectedItem, NormalizationError> {
    let draft = draft_for(raw);

    let external_id = draft.external_id.ok_or(NormalizationError::MissingField {
        provider,
        field: "externalId",
    })?;
    let title = draft.title.ok_or(NormalizationError::MissingField {
        provider,
        field: "title",
    })?;

    Ok(CollectedItem {
        provider,
        item_type: draft.item_type,
        title,
        url: draft.url,
        summary: draft.summary,
        published_at: draft.published_at.unwrap_or(fetched_at),
        source_type: source_type_of(raw),
        status: None,
        external_id,
        metadata: draft.metadata,
    })
}

pub fn normalize(raw: &RawItem, provider: Provider) -> Result<CollectedItem, NormalizationError> {
    normalize_at(raw, provider, Utc::now())
}
