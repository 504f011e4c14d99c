// tests/providers_http.rs
use devfeed_collector::ingest::error::FetchError;
use devfeed_collector::ingest::providers::codeforces::CodeforcesAdapter;
use devfeed_collector::ingest::providers::devto::DevToAdapter;
use devfeed_collector::ingest::providers::github::{GithubAdapter, GithubFeed};
use devfeed_collector::ingest::providers::kaggle::KaggleAdapter;
use devfeed_collector::ingest::providers::newsapi::NewsApiAdapter;
use devfeed_collector::ingest::providers::producthunt::ProductHuntAdapter;
use devfeed_collector::ingest::providers::reddit::RedditAdapter;
use devfeed_collector::ingest::providers::scrape::ContestScrapeAdapter;
use devfeed_collector::ingest::run_tracker::{
    next_run_state, JobParameters, CURSOR_KEY, GYM_KEY, PER_PAGE_KEY, SUBREDDIT_KEY,
};
use devfeed_collector::ingest::types::{Provider, RawItem, SourceAdapter};
use devfeed_collector::ingest::{normalize, RunState};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ATCODER_HTML: &str = include_str!("fixtures/atcoder_contests.html");

fn run(params: JobParameters) -> RunState {
    next_run_state("test", None, &params)
}

fn reddit(base: &str) -> RedditAdapter {
    RedditAdapter::new(reqwest::Client::new(), base, vec!["rust".into()], "new", 25)
}

#[tokio::test]
async fn reddit_null_body_is_an_empty_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/rust/new.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let adapter = reddit(&server.uri());
    let batch = adapter.fetch(&run(JobParameters::new())).await.unwrap();
    assert!(batch.items.is_empty());
    assert_eq!(batch.failed_feeds, 0);
}

#[tokio::test]
async fn reddit_run_params_override_subreddit_and_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/programming/new.json"))
        .and(query_param("after", "t3_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Listing",
            "data": { "children": [
                { "kind": "t3", "data": {
                    "id": "1xyz", "title": "Zero-copy parsing", "url": "https://blog.example/zc",
                    "permalink": "/r/programming/comments/1xyz/", "selftext": "",
                    "author": "ferris", "subreddit": "programming",
                    "created_utc": 1725000000.0, "score": 120
                }}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = reddit(&server.uri());
    let params = JobParameters::new()
        .with(SUBREDDIT_KEY, "programming")
        .with(CURSOR_KEY, "t3_abc");
    let batch = adapter.fetch(&run(params)).await.unwrap();
    assert_eq!(batch.items.len(), 1);

    let item = normalize(&batch.items[0], Provider::Reddit).unwrap();
    assert_eq!(item.external_id, "1xyz");
    assert_eq!(item.published_at.timestamp(), 1_725_000_000);
}

#[tokio::test]
async fn reddit_oversized_page_size_saturates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/rust/new.json"))
        .and(query_param("limit", u32::MAX.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;

    let params = JobParameters::new().with(PER_PAGE_KEY, 5_000_000_000_i64);
    let batch = reddit(&server.uri()).fetch(&run(params)).await.unwrap();
    assert!(batch.items.is_empty());
}

#[tokio::test]
async fn codeforces_failed_status_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .and(query_param("gym", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAILED",
            "comment": "Call limit exceeded"
        })))
        .mount(&server)
        .await;

    let adapter = CodeforcesAdapter::new(reqwest::Client::new(), &server.uri(), false);
    let err = adapter
        .fetch(&run(JobParameters::new().with(GYM_KEY, "true")))
        .await
        .unwrap_err();
    match err {
        FetchError::Remote(msg) => assert_eq!(msg, "Call limit exceeded"),
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn codeforces_contests_are_listed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .and(query_param("gym", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": [
                { "id": 2050, "name": "Codeforces Round 995 (Div. 3)", "type": "ICPC",
                  "phase": "BEFORE", "durationSeconds": 8100, "startTimeSeconds": 1734532500 },
                { "id": 2049, "name": "Educational Round 173", "type": "ICPC",
                  "phase": "FINISHED", "durationSeconds": 7200, "startTimeSeconds": 1734446100 }
            ]
        })))
        .mount(&server)
        .await;

    let adapter = CodeforcesAdapter::new(reqwest::Client::new(), &server.uri(), false);
    let batch = adapter.fetch(&run(JobParameters::new())).await.unwrap();
    assert_eq!(batch.items.len(), 2);
    let first = normalize(&batch.items[0], Provider::Codeforces).unwrap();
    assert_eq!(first.external_id, "2050");
    assert_eq!(first.published_at.timestamp(), 1_734_532_500);
}

#[tokio::test]
async fn atcoder_page_is_scraped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contests/"))
        .and(query_param("lang", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ATCODER_HTML, "text/html"))
        .mount(&server)
        .await;

    let adapter = ContestScrapeAdapter::new(reqwest::Client::new(), &server.uri());
    let batch = adapter.fetch(&run(JobParameters::new())).await.unwrap();
    assert_eq!(batch.items.len(), 2);

    match &batch.items[1] {
        RawItem::Contest(c) => {
            assert_eq!(c.slug, "arc190");
            assert_eq!(c.title, "AtCoder Regular Contest 190 (Div. 1)");
            assert_eq!(c.url, format!("{}/contests/arc190", server.uri()));
            assert_eq!(c.rated_range.as_deref(), Some("1600 - 2999"));
        }
        other => panic!("expected contest, got {other:?}"),
    }
}

#[tokio::test]
async fn atcoder_layout_change_fails_the_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contests/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>maintenance</body></html>"),
        )
        .mount(&server)
        .await;

    let adapter = ContestScrapeAdapter::new(reqwest::Client::new(), &server.uri());
    let err = adapter.fetch(&run(JobParameters::new())).await.unwrap_err();
    assert!(matches!(err, FetchError::Markup { .. }));
}

#[tokio::test]
async fn newsapi_error_payload_is_remote_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(header("X-Api-Key", "k-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "code": "rateLimited",
            "message": "You have made too many requests recently."
        })))
        .mount(&server)
        .await;

    let adapter =
        NewsApiAdapter::new(reqwest::Client::new(), &server.uri(), "k-123".into(), "rust", 20);
    let err = adapter.fetch(&run(JobParameters::new())).await.unwrap_err();
    assert!(matches!(err, FetchError::Remote(ref m) if m.contains("too many requests")));
}

#[tokio::test]
async fn devto_articles_by_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .and(query_param("tag", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 2001, "title": "Lifetimes, gently", "description": "A primer",
              "url": "https://dev.to/ferris/lifetimes", "published_at": "2024-09-03T09:00:00Z",
              "tag_list": ["rust", "beginners"], "user": { "username": "ferris" } }
        ])))
        .mount(&server)
        .await;

    let adapter = DevToAdapter::new(reqwest::Client::new(), &server.uri(), Some("rust".into()), 30);
    let batch = adapter.fetch(&run(JobParameters::new())).await.unwrap();
    let item = normalize(&batch.items[0], Provider::DevTo).unwrap();
    assert_eq!(item.external_id, "2001");
    assert_eq!(item.title, "Lifetimes, gently");
}

#[tokio::test]
async fn http_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let adapter = DevToAdapter::new(reqwest::Client::new(), &server.uri(), None, 30);
    let err = adapter.fetch(&run(JobParameters::new())).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 429, .. }));
}

#[tokio::test]
async fn github_events_use_token_and_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/tokio-rs/tokio/events"))
        .and(header("Authorization", "Bearer ghp_test"))
        .and(query_param("per_page", "5"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "40123", "type": "PushEvent", "actor": { "login": "carllerche" },
              "repo": { "name": "tokio-rs/tokio" }, "created_at": "2024-09-04T10:00:00Z",
              "payload": { "ref": "refs/heads/master", "size": 2 } }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GithubAdapter::new(
        reqwest::Client::new(),
        &server.uri(),
        vec!["tokio-rs/tokio".into()],
        Some("ghp_test".into()),
        GithubFeed::Events,
    );
    let batch = adapter
        .fetch(&run(JobParameters::new().with(PER_PAGE_KEY, 5)))
        .await
        .unwrap();
    let item = normalize(&batch.items[0], Provider::Github).unwrap();
    assert_eq!(item.external_id, "40123");
    assert_eq!(item.title, "PushEvent on tokio-rs/tokio");
    assert_eq!(item.metadata.get("ref").map(String::as_str), Some("refs/heads/master"));
    assert_eq!(item.metadata.get("commits").map(String::as_str), Some("2"));
    assert!(!item.metadata.contains_key("action"));
}

#[tokio::test]
async fn kaggle_competitions_use_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/competitions/list"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 81000, "ref": "llm-detect", "title": "LLM - Detect AI Generated Text",
              "description": "Identify which essay was written by a model",
              "category": "Featured", "reward": "$110,000",
              "deadline": "2024-01-22T23:59:00Z", "enabledDate": "2023-10-31T18:00:00Z",
              "tags": [{ "name": "nlp" }] }
        ])))
        .mount(&server)
        .await;

    let adapter = KaggleAdapter::new(
        reqwest::Client::new(),
        &server.uri(),
        "user".into(),
        "key".into(),
        None,
    );
    let batch = adapter.fetch(&run(JobParameters::new())).await.unwrap();
    let item = normalize(&batch.items[0], Provider::Kaggle).unwrap();
    assert_eq!(item.external_id, "llm-detect");
    assert_eq!(item.url.as_deref(), Some("https://www.kaggle.com/competitions/llm-detect"));
}

#[tokio::test]
async fn producthunt_graphql_posts_and_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .and(body_partial_json(json!({ "variables": { "after": "cursor-1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "posts": { "edges": [
                { "node": { "id": "555", "name": "Zed", "tagline": "A fast editor",
                    "url": "https://www.producthunt.com/posts/zed",
                    "createdAt": "2024-09-01T07:01:00Z", "votesCount": 800,
                    "topics": { "edges": [{ "node": { "name": "Developer Tools" } }] } } }
            ]}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .and(body_partial_json(json!({ "variables": { "after": "bad" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "invalid_oauth_token" }]
        })))
        .mount(&server)
        .await;

    let adapter = ProductHuntAdapter::new(reqwest::Client::new(), &server.uri(), "t".into(), 20);

    let batch = adapter
        .fetch(&run(JobParameters::new().with(CURSOR_KEY, "cursor-1")))
        .await
        .unwrap();
    let item = normalize(&batch.items[0], Provider::ProductHunt).unwrap();
    assert_eq!(item.external_id, "555");
    assert_eq!(item.metadata.get("topics").map(String::as_str), Some("Developer Tools"));

    let err = adapter
        .fetch(&run(JobParameters::new().with(CURSOR_KEY, "bad")))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Remote(ref m) if m == "invalid_oauth_token"));
}
