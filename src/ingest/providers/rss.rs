// src/ingest/providers/rss.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::ingest::error::FetchError;
use crate::ingest::providers::http::read_text;
use crate::ingest::providers::record_fetch;
use crate::ingest::run_tracker::RunState;
use crate::ingest::types::{FetchBatch, Provider, RawItem, SourceAdapter, SourceType};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

/// Element text, ignoring attributes such as `isPermaLink` or `domain`.
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Text>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<Text>,
}

#[derive(Debug, Deserialize)]
struct Atom {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<Text>,
    id: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<Text>,
    content: Option<Text>,
    author: Option<AtomAuthor>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

impl AtomEntry {
    /// `rel="alternate"` (or no rel) wins over other links.
    fn permalink(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .and_then(|l| l.href.clone())
    }
}

/// One flattened feed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub feed: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    /// Raw `pubDate` text, kept for externalId derivation.
    pub pub_date: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum FeedLocation {
    Url(String),
    /// Document held in memory (fixtures, pre-fetched bodies).
    Inline(String),
}

#[derive(Debug, Clone)]
pub struct FeedSpec {
    pub name: String,
    pub location: FeedLocation,
}

impl FeedSpec {
    pub fn url(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            location: FeedLocation::Url(url.to_string()),
        }
    }

    pub fn inline(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            location: FeedLocation::Inline(xml.to_string()),
        }
    }
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let odt = OffsetDateTime::parse(ts.trim(), &Rfc2822).ok()?;
    DateTime::from_timestamp(odt.unix_timestamp(), 0)
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Local name of the document element, if the prolog parses.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned())
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Parse one RSS 2.0 or Atom document into flat entries.
pub fn parse_feed(feed_name: &str, xml: &str) -> Result<Vec<FeedEntry>, FetchError> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    if root_element(&xml_clean).as_deref() == Some("feed") {
        return parse_atom(feed_name, &xml_clean);
    }

    let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::Malformed {
        what: "rss feed",
        message: format!("{feed_name}: {e}"),
    })?;

    let out = rss
        .channel
        .item
        .into_iter()
        .map(|it| FeedEntry {
            feed: feed_name.to_string(),
            published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
            pub_date: it.pub_date,
            title: it.title,
            link: it.link,
            guid: it.guid.and_then(|g| g.value),
            description: it.description,
            author: it.author,
            categories: it.categories.into_iter().filter_map(|c| c.value).collect(),
        })
        .collect();
    Ok(out)
}

fn parse_atom(feed_name: &str, xml: &str) -> Result<Vec<FeedEntry>, FetchError> {
    let atom: Atom = from_str(xml).map_err(|e| FetchError::Malformed {
        what: "atom feed",
        message: format!("{feed_name}: {e}"),
    })?;

    let out = atom
        .entry
        .into_iter()
        .map(|e| {
            let link = e.permalink();
            let pub_date = e.published.or(e.updated);
            FeedEntry {
                feed: feed_name.to_string(),
                title: e.title.and_then(|t| t.value),
                link,
                guid: e.id,
                description: e.summary.or(e.content).and_then(|t| t.value),
                author: e.author.and_then(|a| a.name),
                published_at: pub_date.as_deref().and_then(parse_rfc3339),
                pub_date,
                categories: e.categories.into_iter().filter_map(|c| c.term).collect(),
            }
        })
        .collect();
    Ok(out)
}

/// Several feeds in one job. A feed that fails to load or parse is logged
/// and contributes nothing; the remaining feeds are still attempted.
pub struct RssAdapter {
    client: reqwest::Client,
    feeds: Vec<FeedSpec>,
}

impl RssAdapter {
    pub fn new(client: reqwest::Client, feeds: Vec<FeedSpec>) -> Self {
        Self { client, feeds }
    }

    async fn load(&self, feed: &FeedSpec) -> Result<Vec<FeedEntry>, FetchError> {
        match &feed.location {
            FeedLocation::Inline(xml) => parse_feed(&feed.name, xml),
            FeedLocation::Url(url) => {
                let resp = self.client.get(url).send().await?;
                let body = read_text(resp).await?;
                parse_feed(&feed.name, &body)
            }
        }
    }

    pub async fn fetch_feeds(&self) -> FetchBatch {
        let t0 = std::time::Instant::now();
        let mut batch = FetchBatch::default();

        for feed in &self.feeds {
            match self.load(feed).await {
                Ok(entries) => {
                    tracing::debug!(feed = %feed.name, count = entries.len(), "feed parsed");
                    batch.items.extend(entries.into_iter().map(RawItem::Feed));
                }
                Err(e) => {
                    tracing::warn!(error = %e, feed = %feed.name, "feed failed, skipping");
                    counter!("collector_feed_failures_total").increment(1);
                    batch.failed_feeds += 1;
                }
            }
        }

        record_fetch(Provider::Rss, t0, batch.items.len());
        batch
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn fetch(&self, _run: &RunState) -> Result<FetchBatch, FetchError> {
        Ok(self.fetch_feeds().await)
    }

    fn provider(&self) -> Provider {
        Provider::Rss
    }

    fn source_type(&self) -> SourceType {
        SourceType::Rss
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Blog</title>
  <item>
    <title>Rust 1.80&nbsp;released</title>
    <link>https://blog.example/rust-1-80</link>
    <guid isPermaLink="false">post-180</guid>
    <pubDate>Thu, 25 Jul 2024 10:00:00 +0000</pubDate>
    <category domain="lang">rust</category>
    <category>release</category>
  </item>
  <item>
    <title>No guid here</title>
    <link>https://blog.example/no-guid</link>
  </item>
</channel></rss>"#;

    #[test]
    fn parses_items_guid_dates_and_categories() {
        let entries = parse_feed("blog", FEED).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.guid.as_deref(), Some("post-180"));
        assert_eq!(first.title.as_deref(), Some("Rust 1.80 released"));
        assert_eq!(first.categories, vec!["rust".to_string(), "release".to_string()]);
        assert_eq!(
            first.published_at.map(|d| d.timestamp()),
            Some(1_721_901_600)
        );

        assert!(entries[1].guid.is_none());
        assert!(entries[1].published_at.is_none());
    }

    #[test]
    fn atom_entries_prefer_alternate_link_and_updated_fallback() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>Blog</title>
  <entry>
    <title type="html">Async closures</title>
    <link rel="replies" href="https://blog.example/async-closures#comments"/>
    <link rel="alternate" href="https://blog.example/async-closures"/>
    <id>tag:blog.example,2024:async-closures</id>
    <updated>2024-08-01T09:30:00+02:00</updated>
  </entry>
</feed>"#;
        let entries = parse_feed("blog", xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link.as_deref(), Some("https://blog.example/async-closures"));
        assert_eq!(
            entries[0].guid.as_deref(),
            Some("tag:blog.example,2024:async-closures")
        );
        assert_eq!(entries[0].published_at.map(|d| d.timestamp()), Some(1_722_497_400));
    }

    #[test]
    fn broken_document_is_malformed() {
        let err = parse_feed("bad", "<rss><channel><item>").unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[test]
    fn empty_channel_yields_nothing() {
        let xml = "<rss><channel><title>x</title></channel></rss>";
        assert!(parse_feed("empty", xml).unwrap().is_empty());
    }
}
