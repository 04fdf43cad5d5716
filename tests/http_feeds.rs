use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED},
    },
    response::Response,
};
use http_body_util::BodyExt;
use syndic::{
    application::{
        delivery::{DeliveryOptions, FeedDeliveryService},
        syndication::{AssemblerOptions, FeedAssembler},
    },
    cache::{CacheConfig, CacheTtl, MemoryCacheStore},
    domain::entities::{Collection, ContentItem, SiteProfile},
    infra::{
        content::MemoryContentSource,
        http::{HttpState, build_router},
    },
    util::clock::{Clock, ManualClock},
};
use time::{Duration, macros::datetime};
use tower::ServiceExt;

const DEBUG_VALUE: &str = "letmesee";

fn collection(key: &str, count: i64) -> Collection {
    let items = (0..count)
        .map(|n| {
            let mut item = ContentItem::new(
                format!("https://notes.example/{key}/{n}"),
                format!("Entry {n}"),
            );
            item.date = Some(datetime!(2024-01-01 00:00 UTC) + Duration::hours(n));
            item.body_html = format!("<p>Body {n}</p>");
            item
        })
        .collect();
    Collection {
        key: key.to_string(),
        display_name: format!("{key} notes"),
        items,
    }
}

struct Harness {
    router: Router,
    source: Arc<MemoryContentSource>,
}

fn harness_with(options: DeliveryOptions, collections: Vec<Collection>) -> Harness {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(datetime!(2030-01-01 00:00 UTC)));
    let source = Arc::new(MemoryContentSource::with(collections));

    let mut assembler_options = AssemblerOptions::new(SiteProfile {
        title: "Field Notes".to_string(),
        description: "Writing from the field".to_string(),
        copyright: "All rights reserved".to_string(),
        url: "https://notes.example".to_string(),
    });
    assembler_options.ttl_minutes = options.ttl.minutes();
    assembler_options.generator = "syndic".to_string();

    let assembler = FeedAssembler::new(source.clone(), clock.clone(), assembler_options);
    let store = Arc::new(MemoryCacheStore::new(&CacheConfig::default(), clock.clone()));
    let delivery = Arc::new(FeedDeliveryService::new(assembler, store, clock, options));

    Harness {
        router: build_router(HttpState::new(delivery, DEBUG_VALUE)),
        source,
    }
}

fn harness() -> Harness {
    let options = DeliveryOptions {
        categories: vec!["travel".to_string(), "empty".to_string()],
        ..DeliveryOptions::default()
    };
    harness_with(
        options,
        vec![
            collection("articles", 200),
            collection("travel", 3),
            collection("empty", 0),
        ],
    )
}

async fn send(router: &Router, uri: &str, headers: &[(&str, &str)]) -> Response {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).expect("request should build");
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

fn header(response: &Response, name: axum::http::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn cold_cache_firehose_returns_the_newest_sixty_entries() {
    let h = harness();
    let response = send(&h.router, "/feeds/atom", &[]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header(&response, CONTENT_TYPE).starts_with("application/atom+xml"));
    let etag = header(&response, ETAG);
    assert_eq!(etag.len(), 37);
    assert!(etag.starts_with("\"syn"));
    assert_eq!(
        header(&response, LAST_MODIFIED),
        "Tue, 09 Jan 2024 07:00:00 GMT"
    );

    let body = body_text(response).await;
    assert_eq!(body.matches("<entry>").count(), 60);
    assert!(body.contains("<id>https://notes.example/articles/199</id>"));
    assert!(!body.contains("<id>https://notes.example/articles/139</id>"));
}

#[tokio::test]
async fn matching_entity_tag_gets_not_modified() {
    let h = harness();
    let first = send(&h.router, "/feeds/rss.xml", &[]).await;
    let etag = header(&first, ETAG);
    let last_modified = header(&first, LAST_MODIFIED);

    for candidate in [etag.clone(), format!("W/{etag}")] {
        let response = send(&h.router, "/feeds/rss.xml", &[("if-none-match", &candidate)]).await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(header(&response, ETAG), etag);
        assert_eq!(header(&response, LAST_MODIFIED), last_modified);
        assert!(body_text(response).await.is_empty());
    }
    assert_eq!(h.source.loads(), 1);
}

#[tokio::test]
async fn stale_modified_since_gets_a_fresh_body() {
    let h = harness();
    let response = send(
        &h.router,
        "/feeds/json",
        &[(IF_MODIFIED_SINCE.as_str(), "Mon, 01 Jan 2024 00:00:00 GMT")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header(&response, CONTENT_TYPE).starts_with("application/json"));
    let body = body_text(response).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).expect("valid json");
    assert_eq!(parsed["items"].as_array().map(Vec::len), Some(60));
}

#[tokio::test]
async fn current_modified_since_gets_not_modified() {
    let h = harness();
    let response = send(
        &h.router,
        "/feeds/atom.xml",
        &[(IF_MODIFIED_SINCE.as_str(), "Wed, 01 Jan 2025 00:00:00 GMT")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(
        header(&response, LAST_MODIFIED),
        "Tue, 09 Jan 2024 07:00:00 GMT"
    );
}

#[tokio::test]
async fn obsolete_date_forms_are_honoured() {
    let h = harness();
    for since in [
        "Wednesday, 01-Jan-25 00:00:00 GMT",
        "Wed Jan  1 00:00:00 2025",
    ] {
        let response = send(
            &h.router,
            "/feeds/rss",
            &[(IF_MODIFIED_SINCE.as_str(), since)],
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED, "{since}");
    }
}

#[tokio::test]
async fn malformed_validators_are_rejected_before_any_work() {
    let h = harness();

    let response = send(&h.router, "/feeds/atom", &[(IF_NONE_MATCH.as_str(), "garbage")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(header(&response, CONTENT_TYPE).starts_with("text/plain"));
    assert!(body_text(response).await.contains("If-None-Match"));

    let response = send(&h.router, "/feeds/atom", &[(IF_MODIFIED_SINCE.as_str(), "soon")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(h.source.loads(), 0);
}

#[tokio::test]
async fn unknown_category_is_not_found_without_cache_interaction() {
    let h = harness();
    let response = send(&h.router, "/feeds/recipes/atom", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("recipes"));
    assert_eq!(h.source.loads(), 0);
}

#[tokio::test]
async fn both_category_routes_serve_the_same_feed() {
    let h = harness();
    let first = send(&h.router, "/feeds/travel/rss", &[]).await;
    let second = send(&h.router, "/travel/feeds/rss.xml", &[]).await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header(&first, ETAG), header(&second, ETAG));

    let body = body_text(first).await;
    assert!(body.contains("<title>Field Notes - travel notes</title>"));
    assert_eq!(body.matches("<item>").count(), 3);
}

#[tokio::test]
async fn empty_category_renders_a_bare_channel() {
    let h = harness();
    let response = send(&h.router, "/feeds/empty/rss", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;

    insta::assert_snapshot!(body.trim_end(), @r#"
<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <atom:link href="https://notes.example/feeds/empty/rss.xml" rel="self" type="application/rss+xml" />
    <title>Field Notes - empty notes</title>
    <link>https://notes.example/</link>
    <description>Writing from the field</description>
    <copyright>All rights reserved</copyright>
    <lastBuildDate>Thu, 01 Jan 1970 00:00:00 +0000</lastBuildDate>
    <generator>syndic</generator>
    <ttl>10</ttl>
  </channel>
</rss>
"#);
}

#[tokio::test]
async fn disabled_feeds_are_unavailable() {
    let options = DeliveryOptions {
        disabled: true,
        ..DeliveryOptions::default()
    };
    let h = harness_with(options, vec![collection("articles", 3)]);
    let response = send(&h.router, "/feeds/atom", &[]).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(header(&response, CONTENT_TYPE).starts_with("text/plain"));
}

#[tokio::test]
async fn category_feeds_without_configuration_are_not_found() {
    let h = harness_with(DeliveryOptions::default(), vec![collection("travel", 3)]);
    let response = send(&h.router, "/feeds/travel/atom", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_format_is_not_found() {
    let h = harness();
    let response = send(&h.router, "/feeds/sitemap.xml", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_firehose_collection_is_a_server_error() {
    let h = harness_with(DeliveryOptions::default(), vec![]);
    let response = send(&h.router, "/feeds/atom", &[]).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn debug_annotations_require_the_configured_value() {
    let h = harness();

    let annotated = send(&h.router, &format!("/feeds/atom?debug={DEBUG_VALUE}"), &[]).await;
    assert_eq!(annotated.status(), StatusCode::OK);
    let body = body_text(annotated).await;
    assert!(body.contains("[debug atom]"));
    assert!(body.contains("<!-- Freshly generated; cached into "));

    let plain = send(&h.router, "/feeds/atom?debug=guess", &[]).await;
    let body = body_text(plain).await;
    assert!(!body.contains("<!--"));
    assert!(!body.contains("[debug atom]"));
}

#[tokio::test]
async fn disabled_cache_serves_fresh_bodies_with_default_ttl() {
    let options = DeliveryOptions {
        ttl: CacheTtl::DISABLED,
        ..DeliveryOptions::default()
    };
    let h = harness_with(options, vec![collection("articles", 2)]);

    let first = send(&h.router, "/feeds/rss", &[]).await;
    let etag = header(&first, ETAG);
    assert!(body_text(first).await.contains("<ttl>60</ttl>"));

    let second = send(&h.router, "/feeds/rss", &[(IF_NONE_MATCH.as_str(), &etag)]).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(h.source.loads(), 2);
}

#[tokio::test]
async fn health_endpoint_responds() {
    let h = harness();
    let response = send(&h.router, "/_health", &[]).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
