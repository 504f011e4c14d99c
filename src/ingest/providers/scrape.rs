// src/ingest/providers/scrape.rs
//! AtCoder upcoming-contest table scraper.
//!
//! Unlike RSS, any network or markup-shape problem fails the whole fetch:
//! a scrape returns either every row or an error, never a partial table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::ingest::error::FetchError;
use crate::ingest::providers::http::{read_text, trim_base};
use crate::ingest::providers::record_fetch;
use crate::ingest::run_tracker::RunState;
use crate::ingest::types::{FetchBatch, Provider, RawItem, SourceAdapter, SourceType};

pub const DEFAULT_BASE_URL: &str = "https://atcoder.jp";

static SEL_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#contest-table-upcoming").expect("static selector"));
static SEL_ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tbody tr").expect("static selector"));
static SEL_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("static selector"));
static SEL_TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").expect("static selector"));
static SEL_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href^="/contests/"]"#).expect("static selector"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedContest {
    pub slug: String,
    pub title: String,
    pub url: String,
    pub start_time: Option<DateTime<Utc>>,
    pub duration: Option<String>,
    pub rated_range: Option<String>,
}

fn cell_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_start(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S%z")
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Parse the contest listing page. `page_url` is only used in error messages,
/// `origin` to absolutize contest links.
pub fn parse_contest_table(
    html: &str,
    page_url: &str,
    origin: &str,
) -> Result<Vec<ScrapedContest>, FetchError> {
    let markup = |message: &str| FetchError::Markup {
        url: page_url.to_string(),
        message: message.to_string(),
    };

    let document = Html::parse_document(html);
    let table = document
        .select(&SEL_TABLE)
        .next()
        .ok_or_else(|| markup("upcoming contest table not found"))?;

    let mut out = Vec::new();
    for (idx, row) in table.select(&SEL_ROWS).enumerate() {
        let cells: Vec<ElementRef<'_>> = row.select(&SEL_CELL).collect();
        if cells.len() < 2 {
            return Err(markup(&format!("row {idx} has {} cells", cells.len())));
        }

        let link = cells[1]
            .select(&SEL_LINK)
            .next()
            .ok_or_else(|| markup(&format!("row {idx} has no contest link")))?;
        let href = link.value().attr("href").unwrap_or_default();
        let slug = href
            .trim_start_matches("/contests/")
            .trim_end_matches('/')
            .to_string();
        if slug.is_empty() {
            return Err(markup(&format!("row {idx} has an empty contest slug")));
        }

        let start_time = cells[0]
            .select(&SEL_TIME)
            .next()
            .and_then(|t| parse_start(&cell_text(&t)));

        out.push(ScrapedContest {
            url: format!("{origin}{href}"),
            title: cell_text(&link),
            slug,
            start_time,
            duration: cells.get(2).map(cell_text).filter(|s| !s.is_empty()),
            rated_range: cells.get(3).map(cell_text).filter(|s| !s.is_empty()),
        });
    }
    Ok(out)
}

pub struct ContestScrapeAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl ContestScrapeAdapter {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
        }
    }
}

#[async_trait]
impl SourceAdapter for ContestScrapeAdapter {
    async fn fetch(&self, _run: &RunState) -> Result<FetchBatch, FetchError> {
        let t0 = std::time::Instant::now();
        let page_url = format!("{}/contests/", self.base_url);

        let resp = self
            .client
            .get(&page_url)
            .query(&[("lang", "en")])
            .send()
            .await?;
        let html = read_text(resp).await?;
        let contests = parse_contest_table(&html, &page_url, &self.base_url)?;

        let out: Vec<RawItem> = contests.into_iter().map(RawItem::Contest).collect();
        record_fetch(Provider::Atcoder, t0, out.len());
        Ok(out.into())
    }

    fn provider(&self) -> Provider {
        Provider::Atcoder
    }

    fn source_type(&self) -> SourceType {
        SourceType::Scrape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
<div id="contest-table-upcoming"><table><tbody>
<tr>
  <td class="text-center"><a href="https://www.timeanddate.com/x"><time class="fixtime">2025-01-05 21:00:00+0900</time></a></td>
  <td><span>A</span> <a href="/contests/abc387">AtCoder Beginner Contest 387</a></td>
  <td class="text-center">01:40</td>
  <td class="text-center"> - 1999</td>
</tr>
</tbody></table></div>
</body></html>"#;

    #[test]
    fn parses_upcoming_rows() {
        let rows = parse_contest_table(PAGE, "https://atcoder.jp/contests/", "https://atcoder.jp")
            .unwrap();
        assert_eq!(rows.len(), 1);
        let c = &rows[0];
        assert_eq!(c.slug, "abc387");
        assert_eq!(c.title, "AtCoder Beginner Contest 387");
        assert_eq!(c.url, "https://atcoder.jp/contests/abc387");
        assert_eq!(c.duration.as_deref(), Some("01:40"));
        assert_eq!(c.rated_range.as_deref(), Some("- 1999"));
        assert_eq!(
            c.start_time.map(|d| d.to_rfc3339()),
            Some("2025-01-05T12:00:00+00:00".to_string())
        );
    }

    #[test]
    fn missing_table_is_markup_error() {
        let err = parse_contest_table("<html></html>", "u", "o").unwrap_err();
        assert!(matches!(err, FetchError::Markup { .. }));
    }

    #[test]
    fn row_without_link_fails_whole_page() {
        let page = r#"<div id="contest-table-upcoming"><table><tbody>
<tr><td><a href="/contests/ok1">Ok</a></td><td><a href="/contests/ok1">Ok</a></td></tr>
<tr><td>x</td><td>no link</td></tr>
</tbody></table></div>"#;
        let err = parse_contest_table(page, "u", "o").unwrap_err();
        assert!(matches!(err, FetchError::Markup { .. }));
    }
}
