use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_catalog::{CatalogClient, CatalogError, HttpCatalogClient, SearchKind};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
    }
}

fn catalog(http: MockHttpClient) -> HttpCatalogClient {
    HttpCatalogClient::new(
        Arc::new(http),
        Url::parse("http://catalog.local:8789").unwrap(),
    )
}

#[tokio::test]
async fn test_resolve_stream_builds_request() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .withf(|request| {
            request.method == HttpMethod::Get
                && request.url == "http://catalog.local:8789/youtube/audio/abc"
                && request.header_value("accept") == Some("application/json")
                && request.header_value("cache-control").is_none()
                && request.timeout == Some(Duration::from_secs(5))
        })
        .times(1)
        .returning(|_| {
            Ok(HttpResponse::new(
                200,
                r#"{"videoId":"abc","title":"Song","artist":"Band","audioUrl":"https://cdn/a"}"#,
            ))
        });

    let stream = catalog(http)
        .with_timeout(Duration::from_secs(5))
        .resolve_stream("abc")
        .await
        .unwrap();

    assert_eq!(stream.title, "Song");
    assert_eq!(stream.artist, "Band");
    assert_eq!(stream.stream_url, "https://cdn/a");
}

#[tokio::test]
async fn test_resolve_stream_fresh_bypasses_cache() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .withf(|request| request.header_value("Cache-Control") == Some("no-cache"))
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, r#"{"audioUrl":"https://cdn/b"}"#)));

    let stream = catalog(http).resolve_stream_fresh("b").await.unwrap();
    assert_eq!(stream.id, "b");
    assert_eq!(stream.thumbnail_url, "https://i.ytimg.com/vi/b/hq720.jpg");
}

#[tokio::test]
async fn test_resolve_stream_without_url_fails() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .returning(|_| Ok(HttpResponse::new(200, r#"{"title":"Silent"}"#)));

    let err = catalog(http).resolve_stream("x").await.unwrap_err();
    assert!(matches!(err, CatalogError::MissingStreamUrl { .. }));
}

#[tokio::test]
async fn test_http_status_is_reported() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .returning(|_| Ok(HttpResponse::new(404, "not found")));

    let err = catalog(http).related_tracks("x").await.unwrap_err();
    match err {
        CatalogError::HttpStatus { status, endpoint } => {
            assert_eq!(status, 404);
            assert_eq!(endpoint, "/youtube/related/x");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_transport_error_is_propagated() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .returning(|_| Err(BridgeError::Transport("connection refused".to_string())));

    let err = catalog(http).resolve_stream("x").await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_invalid_json_is_rejected() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .returning(|_| Ok(HttpResponse::new(200, "<html>")));

    let err = catalog(http).related_tracks("x").await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_related_tracks_wrapped_payload() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .withf(|request| request.url.ends_with("/youtube/related/seed"))
        .returning(|_| {
            Ok(HttpResponse::new(
                200,
                r#"{"items":[{"videoId":"y","title":"Y"},{"id":"z","artistName":"Zed"},{"title":"orphan"}]}"#,
            ))
        });

    let related = catalog(http).related_tracks("seed").await.unwrap();
    let ids: Vec<_> = related.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["y", "z"]);
    assert_eq!(related[1].artist, "Zed");
}

#[tokio::test]
async fn test_playlist_tracks() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .withf(|request| request.url == "http://catalog.local:8789/youtube/playlist/PL1")
        .returning(|_| {
            Ok(HttpResponse::new(
                200,
                r#"{"title":"Mix","songs":[{"videoId":"a"},{"videoId":"b","thumbnailUrl":"https://t/b"}]}"#,
            ))
        });

    let tracks = catalog(http)
        .with_thumbnail_template("https://img.local/{id}.jpg")
        .playlist_tracks("PL1")
        .await
        .unwrap();

    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].thumbnail_url, "https://img.local/a.jpg");
    assert_eq!(tracks[1].thumbnail_url, "https://t/b");
}

#[tokio::test]
async fn test_search_sends_query_parameter() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .withf(|request| {
            request.url == "http://catalog.local:8789/search"
                && request.query == vec![("q".to_string(), "lofi beats".to_string())]
        })
        .times(1)
        .returning(|_| {
            Ok(HttpResponse::new(
                200,
                r#"[{"type":"SONG","videoId":"s1","title":"Rain","artistName":"Band"},
                    {"type":"PLAYLIST","playlistId":"p1","title":"Study"}]"#,
            ))
        });

    let results = catalog(http).search("lofi beats").await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].kind, SearchKind::Song);
    assert_eq!(results[0].as_track().unwrap().artist, "Band");
    assert_eq!(results[1].kind, SearchKind::Playlist);
    assert_eq!(results[1].id, "p1");
}

#[tokio::test]
async fn test_search_suggestions() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .withf(|request| {
            request.url == "http://catalog.local:8789/search/suggestions"
                && request.query == vec![("q".to_string(), "lo".to_string())]
        })
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, r#"["lofi","lorde",42]"#)));

    let suggestions = catalog(http).search_suggestions("lo").await.unwrap();
    assert_eq!(suggestions, vec!["lofi", "lorde", "42"]);
}

#[tokio::test]
async fn test_blank_suggestion_query_skips_request() {
    let mut http = MockHttpClient::new();
    http.expect_execute().never();

    let suggestions = catalog(http).search_suggestions("  ").await.unwrap();
    assert!(suggestions.is_empty());
}
