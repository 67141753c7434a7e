use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use debrid_streams::addon::{AddonClient, AddonError, CatalogQuery};
use debrid_streams::content::{ContentKind, ContentRef};

fn client(server: &MockServer) -> AddonClient {
    AddonClient::new(&format!("{}/manifest.json", server.uri()), Duration::from_secs(5))
}

#[tokio::test]
async fn test_fetch_movie_streams() {
    let mock_server = MockServer::start().await;

    let response_body = r#"{
        "streams": [
            {
                "name": "[RD+] AIOStreams 1080p",
                "title": "The.Matrix.1999.1080p.BluRay.x264 8.2 GB",
                "url": "https://cdn.example/dl/matrix.mkv",
                "behaviorHints": {
                    "proxyHeaders": {
                        "request": { "Referer": "https://debrid.example/" }
                    }
                }
            },
            {
                "name": "Torrent",
                "title": "The.Matrix.1999.720p",
                "externalUrl": "https://web.example/watch/1"
            }
        ]
    }"#;

    Mock::given(method("GET"))
        .and(path("/stream/movie/tt0133093.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_body))
        .mount(&mock_server)
        .await;

    let streams = client(&mock_server)
        .fetch_streams(&ContentRef::movie("tt0133093"))
        .await
        .unwrap();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].resolve_url(), Some("https://cdn.example/dl/matrix.mkv"));
    assert_eq!(streams[0].parse().quality.as_deref(), Some("1080P"));
    assert_eq!(
        streams[0]
            .proxy_request_headers()
            .and_then(|h| h.get("Referer"))
            .map(String::as_str),
        Some("https://debrid.example/")
    );
    assert_eq!(streams[1].resolve_url(), Some("https://web.example/watch/1"));
}

#[tokio::test]
async fn test_fetch_episode_streams_uses_season_episode_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stream/series/tt0903747:2:5.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"streams":[{"name":"Comet","title":"S02E05 2160p","url":"https://x/y"}]}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let streams = client(&mock_server)
        .fetch_streams(&ContentRef::episode("tt0903747", 2, 5))
        .await
        .unwrap();

    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].name.as_deref(), Some("Comet"));
}

#[tokio::test]
async fn test_missing_streams_field_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stream/movie/tt0000001.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"cacheMaxAge": 60}"#))
        .mount(&mock_server)
        .await;

    let streams = client(&mock_server)
        .fetch_streams(&ContentRef::movie("tt0000001"))
        .await
        .unwrap();

    assert!(streams.is_empty());
}

#[tokio::test]
async fn test_http_error_carries_status_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stream/movie/tt0000002.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .fetch_streams(&ContentRef::movie("tt0000002"))
        .await
        .unwrap_err();

    match err {
        AddonError::Status(reason) => assert_eq!(reason, "Not Found"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_json_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stream/movie/tt0000003.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .fetch_streams(&ContentRef::movie("tt0000003"))
        .await
        .unwrap_err();

    assert!(matches!(err, AddonError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_fetch_manifest() {
    let mock_server = MockServer::start().await;

    let response_body = r#"{
        "id": "com.aiostreams",
        "name": "AIOStreams",
        "catalogs": [
            { "id": "tmdb.popular", "type": "movie", "name": "Popular" },
            { "id": "tmdb.trending", "type": "series", "name": "Trending" }
        ]
    }"#;

    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_body))
        .mount(&mock_server)
        .await;

    let manifest = client(&mock_server).fetch_manifest().await.unwrap();

    assert_eq!(manifest.name.as_deref(), Some("AIOStreams"));
    assert_eq!(manifest.catalogs.len(), 2);
    assert_eq!(manifest.catalogs[1].content_type, "series");
}

#[tokio::test]
async fn test_manifest_without_catalogs_is_invalid() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"x","catalogs":{}}"#))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server).fetch_manifest().await.unwrap_err();
    assert_eq!(err.to_string(), "invalid response: invalid manifest format");
}

#[tokio::test]
async fn test_fetch_catalog_with_skip() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalog/movie/tmdb.popular/skip=20.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"metas":[{"id":"tt0111161","type":"movie","name":"The Shawshank Redemption","imdbRating":"9.3","releaseInfo":"1994"}]}"#,
        ))
        .mount(&mock_server)
        .await;

    let query = CatalogQuery { genre: None, skip: 20 };
    let metas = client(&mock_server)
        .fetch_catalog("movie", "tmdb.popular", &query)
        .await
        .unwrap();

    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0].display_title(), "The Shawshank Redemption");
    assert_eq!(metas[0].rating(), Some(9.3));
    assert_eq!(metas[0].year(), Some(1994));
}

#[tokio::test]
async fn test_fetch_meta_counts_seasons() {
    let mock_server = MockServer::start().await;

    let response_body = r#"{
        "meta": {
            "id": "tt0903747",
            "type": "series",
            "name": "Breaking Bad",
            "releaseInfo": "2008-2013",
            "videos": [
                { "season": 0, "episode": 1 },
                { "season": 1, "episode": 1 },
                { "season": 1, "episode": 7 },
                { "season": 2, "episode": 13 }
            ]
        }
    }"#;

    Mock::given(method("GET"))
        .and(path("/meta/series/tt0903747.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_body))
        .mount(&mock_server)
        .await;

    let meta = client(&mock_server)
        .fetch_meta(ContentKind::Series, "tt0903747")
        .await
        .unwrap()
        .to_title_meta();

    assert_eq!(meta.title, "Breaking Bad");
    assert_eq!(meta.year, Some(2008));
    assert_eq!(meta.kind(), ContentKind::Series);
    assert_eq!(meta.season_count(), 2);
    assert_eq!(meta.episode_count(1), 7);
    assert_eq!(meta.episode_count(2), 13);
}

#[tokio::test]
async fn test_unconfigured_client() {
    let client = AddonClient::new("", Duration::from_secs(1));
    assert!(!client.is_configured());
    assert!(matches!(
        client.fetch_streams(&ContentRef::movie("tt1")).await,
        Err(AddonError::NotConfigured)
    ));
}
