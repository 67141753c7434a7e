use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use debrid_streams::content::{ContentRef, TitleMeta};
use debrid_streams::trakt::{TraktClient, TraktError};

fn client(server: &MockServer) -> TraktClient {
    TraktClient::with_base_url(Some("client-id".into()), Some("secret".into()), server.uri()).unwrap()
}

#[tokio::test]
async fn test_show_history_resolves_trakt_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/imdb/tt0903747"))
        .and(query_param("type", "show"))
        .and(header("trakt-api-key", "client-id"))
        .and(header("trakt-api-version", "2"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"type":"show","score":1000,"show":{"title":"Breaking Bad","year":2008,"ids":{"trakt":1388,"imdb":"tt0903747","tmdb":1396}}}]"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sync/history/shows/1388"))
        .and(query_param("extended", "full"))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[
                {"id":1,"watched_at":"2024-03-01T20:00:00.000Z","action":"watch","type":"episode","episode":{"season":1,"number":4,"title":"Cancer Man"}},
                {"id":2,"watched_at":"2024-02-01T20:00:00.000Z","action":"watch","type":"episode","episode":{"season":2,"number":1}}
            ]"#,
        ))
        .mount(&mock_server)
        .await;

    let history = client(&mock_server).watch_history("tt0903747").await.unwrap();

    assert_eq!(history.len(), 2);
    assert!(history.is_watched(1, 4));
    assert!(history.is_watched(2, 1));
    assert!(!history.is_watched(1, 1));
    assert_eq!(history.watched_in_season(1), 1);
}

#[tokio::test]
async fn test_unknown_show_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/imdb/tt9999999"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let trakt = client(&mock_server);
    assert!(matches!(
        trakt.show_history("tt9999999").await,
        Err(TraktError::NotFound(_))
    ));
    assert!(trakt.watch_history("tt9999999").await.is_none());
}

#[tokio::test]
async fn test_add_episode_to_history() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sync/history"))
        .and(header("Authorization", "Bearer secret"))
        .and(body_json(serde_json::json!({
            "shows": [{
                "title": "Breaking Bad",
                "year": 2008,
                "ids": { "imdb": "tt0903747" },
                "seasons": [{ "number": 2, "episodes": [{ "number": 5 }] }]
            }]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"added":{"episodes":1}}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let meta = TitleMeta {
        year: Some(2008),
        ..TitleMeta::series("tt0903747", "Breaking Bad", Vec::new())
    };

    client(&mock_server)
        .add_to_history(&meta, &ContentRef::episode("tt0903747", 2, 5))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_movie_to_history() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sync/history"))
        .and(body_json(serde_json::json!({
            "movies": [{ "title": "The Matrix", "ids": { "imdb": "tt0133093" } }]
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    client(&mock_server)
        .add_to_history(
            &TitleMeta::movie("tt0133093", "The Matrix"),
            &ContentRef::movie("tt0133093"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_to_history_reports_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sync/history"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .add_to_history(
            &TitleMeta::movie("tt0133093", "The Matrix"),
            &ContentRef::movie("tt0133093"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TraktError::Status(status) if status.as_u16() == 401));
}
