use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::{Clock, ManualClock};
use chrono::{TimeZone, Utc};
use core_cache::{CacheConfig, CachingHttpClient, STALE_WARNING};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use mockall::{mock, Sequence};
use std::sync::Arc;
use std::time::Duration;

mock! {
    Upstream {}

    #[async_trait]
    impl HttpClient for Upstream {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
    }
}

const RELATED_URL: &str = "https://api.example.com/youtube/related/abc";

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ))
}

fn client(upstream: MockUpstream, clock: &Arc<ManualClock>) -> CachingHttpClient {
    let clock: Arc<dyn Clock> = clock.clone();
    CachingHttpClient::new(Arc::new(upstream), clock)
}

#[tokio::test]
async fn test_fresh_entry_served_without_network() {
    let mut upstream = MockUpstream::new();
    upstream.expect_execute().times(1).returning(|_| {
        Ok(HttpResponse::new(200, "[1]").with_header("Cache-Control", "max-age=60"))
    });

    let clock = clock();
    let cached = client(upstream, &clock);

    let first = cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    clock.advance(Duration::from_secs(30));
    let second = cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();

    assert_eq!(first.body, second.body);
    let stats = cached.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.stored, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_age_header_shortens_lifetime() {
    let mut seq = Sequence::new();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(HttpResponse::new(200, "old")
                .with_header("Cache-Control", "max-age=60")
                .with_header("Age", "50"))
        });
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, "new")));

    let clock = clock();
    let cached = client(upstream, &clock);

    cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    clock.advance(Duration::from_secs(11));
    let response = cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();

    assert_eq!(response.text().unwrap(), "new");
}

#[tokio::test]
async fn test_stale_entry_served_when_network_fails() {
    let mut seq = Sequence::new();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(HttpResponse::new(200, "cached").with_header("Cache-Control", "max-age=10"))
        });
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(BridgeError::Transport("connection reset".to_string())));

    let clock = clock();
    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let cached = client(upstream, &clock).with_event_bus(bus);

    cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    clock.advance(Duration::from_secs(3600));
    let response = cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.text().unwrap(), "cached");
    assert_eq!(response.header("warning"), Some(STALE_WARNING));
    assert_eq!(cached.stats().stale_served, 1);

    match events.recv().await.unwrap() {
        CoreEvent::Cache(CacheEvent::StaleServed { status, .. }) => assert_eq!(status, 200),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_falls_back_to_stale_entry() {
    let mut seq = Sequence::new();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, "cached")));
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(503, "busy")));

    let clock = clock();
    let cached = client(upstream, &clock);

    cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    let response = cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.text().unwrap(), "cached");
}

#[tokio::test]
async fn test_network_error_without_entry_propagates() {
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .times(1)
        .returning(|_| Err(BridgeError::Timeout("30s".to_string())));

    let cached = client(upstream, &clock());
    let err = cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap_err();

    assert!(matches!(err, BridgeError::Timeout(_)));
    assert_eq!(cached.stats().entries, 0);
}

#[tokio::test]
async fn test_client_error_is_not_cached_or_replaced() {
    let mut seq = Sequence::new();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, "good")));
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(404, "gone")));

    let cached = client(upstream, &clock());

    cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    let response = cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(cached.stats().stored, 1);
}

#[tokio::test]
async fn test_not_modified_revalidates_and_extends_expiry() {
    let mut seq = Sequence::new();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(HttpResponse::new(200, "body-v1")
                .with_header("ETag", "\"v1\"")
                .with_header("Last-Modified", "Wed, 01 May 2024 11:00:00 GMT")
                .with_header("Cache-Control", "max-age=10"))
        });
    upstream
        .expect_execute()
        .withf(|request| {
            request.header_value("if-none-match") == Some("\"v1\"")
                && request.header_value("if-modified-since")
                    == Some("Wed, 01 May 2024 11:00:00 GMT")
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(HttpResponse::new(304, "").with_header("Cache-Control", "max-age=120"))
        });

    let clock = clock();
    let cached = client(upstream, &clock);

    cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    clock.advance(Duration::from_secs(20));
    let revalidated = cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    assert_eq!(revalidated.status, 200);
    assert_eq!(revalidated.text().unwrap(), "body-v1");

    // Now live for another two minutes
    clock.advance(Duration::from_secs(60));
    let hit = cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    assert_eq!(hit.text().unwrap(), "body-v1");

    let stats = cached.stats();
    assert_eq!(stats.revalidated, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_no_store_response_deletes_entry() {
    let mut seq = Sequence::new();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, "v1")));
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, "v2").with_header("Cache-Control", "no-store")));

    let cached = client(upstream, &clock());

    cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    assert_eq!(cached.store().len(), 1);

    let response = cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    assert_eq!(response.text().unwrap(), "v2");
    assert!(cached.store().is_empty());
}

#[tokio::test]
async fn test_request_no_cache_skips_fresh_entry() {
    let mut seq = Sequence::new();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(HttpResponse::new(200, "v1").with_header("Cache-Control", "max-age=600"))
        });
    upstream
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, "v2")));

    let cached = client(upstream, &clock());

    cached.execute(HttpRequest::get(RELATED_URL)).await.unwrap();
    let response = cached
        .execute(HttpRequest::get(RELATED_URL).header("Cache-Control", "no-cache"))
        .await
        .unwrap();

    assert_eq!(response.text().unwrap(), "v2");
    assert_eq!(cached.stats().hits, 0);
}

#[tokio::test]
async fn test_non_get_requests_pass_through() {
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .withf(|request| request.method == HttpMethod::Head)
        .times(2)
        .returning(|_| Ok(HttpResponse::new(200, "").with_header("Cache-Control", "max-age=600")));

    let cached = client(upstream, &clock());

    for _ in 0..2 {
        cached.execute(HttpRequest::head(RELATED_URL)).await.unwrap();
    }

    let stats = cached.stats();
    assert_eq!(stats.bypassed, 2);
    assert_eq!(stats.entries, 0);
}

#[tokio::test]
async fn test_query_parameters_are_part_of_the_key() {
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .times(2)
        .returning(|_| Ok(HttpResponse::new(200, "{}").with_header("Cache-Control", "max-age=600")));

    let cached = client(upstream, &clock());

    cached
        .execute(HttpRequest::get(RELATED_URL).query("page", "1"))
        .await
        .unwrap();
    cached
        .execute(HttpRequest::get(RELATED_URL).query("page", "2"))
        .await
        .unwrap();
    cached
        .execute(HttpRequest::get(RELATED_URL).query("page", "1"))
        .await
        .unwrap();

    assert_eq!(cached.stats().hits, 1);
    assert_eq!(cached.stats().entries, 2);
}

#[tokio::test]
async fn test_invalidate_prefix_and_clear() {
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .returning(|_| Ok(HttpResponse::new(200, "{}").with_header("Cache-Control", "max-age=600")));

    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let cached = client(upstream, &clock()).with_event_bus(bus);

    for path in ["related/a", "related/b", "audio/a"] {
        let url = format!("https://api.example.com/youtube/{}", path);
        cached.execute(HttpRequest::get(url)).await.unwrap();
    }

    assert_eq!(cached.invalidate_prefix("/youtube/related/"), 2);
    assert_eq!(cached.store().len(), 1);
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Cache(CacheEvent::Cleared {
            prefix: Some("/youtube/related/".to_string()),
            removed: 2,
        })
    );

    assert_eq!(cached.clear(), 1);
    assert!(cached.store().is_empty());
}

#[tokio::test]
async fn test_bounded_store_from_config() {
    let mut upstream = MockUpstream::new();
    upstream
        .expect_execute()
        .returning(|_| Ok(HttpResponse::new(200, "{}").with_header("Cache-Control", "max-age=600")));

    let clock: Arc<dyn Clock> = clock();
    let cached = CachingHttpClient::with_config(
        Arc::new(upstream),
        clock,
        &CacheConfig::new().with_max_entries(2),
    );

    for id in ["a", "b", "c"] {
        let url = format!("https://api.example.com/youtube/audio/{}", id);
        cached.execute(HttpRequest::get(url)).await.unwrap();
    }

    assert_eq!(cached.store().len(), 2);
}
