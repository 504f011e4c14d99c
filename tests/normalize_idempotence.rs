// tests/normalize_idempotence.rs
use chrono::{Duration, TimeZone, Utc};
use devfeed_collector::ingest::error::NormalizationError;
use devfeed_collector::ingest::normalize::normalize_at;
use devfeed_collector::ingest::providers::rss::parse_feed;
use devfeed_collector::ingest::types::{ItemType, Provider, RawItem};
use serde_json::json;

const DEVBLOG_XML: &str = include_str!("fixtures/devblog_rss.xml");

fn raw_items() -> Vec<(RawItem, Provider)> {
    let mut release: devfeed_collector::ingest::providers::github::GithubRelease =
        serde_json::from_value(json!({
            "id": 1, "tag_name": "v0.7.0", "name": "axum v0.7.0",
            "html_url": "https://github.com/tokio-rs/axum/releases/tag/v0.7.0",
            "published_at": "2023-11-27T12:00:00Z"
        }))
        .unwrap();
    release.repo = "tokio-rs/axum".to_string();

    let news = serde_json::from_value(json!({
        "source": { "id": null, "name": "The Register" },
        "title": "Rust in the kernel", "url": "https://news.example/rust-kernel",
        "publishedAt": "2024-09-02T06:00:00Z"
    }))
    .unwrap();

    let reddit = serde_json::from_value(json!({
        "id": "1f00aa", "title": "Show r/rust: a tiny ECS", "permalink": "/r/rust/comments/1f00aa/",
        "created_utc": 1725100000.0
    }))
    .unwrap();

    let mut out = vec![
        (RawItem::GithubRelease(release), Provider::Github),
        (RawItem::News(news), Provider::NewsApi),
        (RawItem::Reddit(reddit), Provider::Reddit),
    ];
    out.extend(
        parse_feed("devblog", DEVBLOG_XML)
            .unwrap()
            .into_iter()
            .map(|e| (RawItem::Feed(e), Provider::Rss)),
    );
    out
}

#[test]
fn same_raw_item_normalizes_to_identical_external_id() {
    let t1 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let t2 = t1 + Duration::hours(6);

    for (raw, provider) in raw_items() {
        let a = normalize_at(&raw, provider, t1).unwrap();
        let b = normalize_at(&raw, provider, t2).unwrap();
        assert_eq!(a.external_id, b.external_id, "{provider} item drifted");
        assert!(!a.external_id.is_empty());
        assert_eq!(a.provider, provider);
    }
}

#[test]
fn release_id_is_repo_and_tag() {
    let (raw, provider) = raw_items().remove(0);
    let item = normalize_at(&raw, provider, Utc::now()).unwrap();
    assert_eq!(item.external_id, "tokio-rs/axum@v0.7.0");
    assert_eq!(item.item_type, ItemType::Release);
    assert_eq!(item.metadata.get("repo").map(String::as_str), Some("tokio-rs/axum"));
}

#[test]
fn missing_publication_time_falls_back_to_fetch_time() {
    let reddit = serde_json::from_value(json!({ "id": "x1", "title": "No timestamp" })).unwrap();
    let fetched = Utc.with_ymd_and_hms(2025, 5, 5, 5, 5, 5).unwrap();
    let item = normalize_at(&RawItem::Reddit(reddit), Provider::Reddit, fetched).unwrap();
    assert_eq!(item.published_at, fetched);
}

#[test]
fn required_fields_are_enforced() {
    let no_id = serde_json::from_value(json!({ "title": "orphan" })).unwrap();
    let err = normalize_at(&RawItem::Reddit(no_id), Provider::Reddit, Utc::now()).unwrap_err();
    assert_eq!(
        err,
        NormalizationError::MissingField {
            provider: Provider::Reddit,
            field: "externalId"
        }
    );

    let no_title = serde_json::from_value(json!({ "id": 77, "url": "https://dev.to/x" })).unwrap();
    let err = normalize_at(&RawItem::DevTo(no_title), Provider::DevTo, Utc::now()).unwrap_err();
    assert!(matches!(err, NormalizationError::MissingField { field: "title", .. }));
}
