use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use debrid_streams::addon::AddonClient;
use debrid_streams::content::TitleMeta;
use debrid_streams::controller::ListController;
use debrid_streams::screen::{ScreenCommand, StreamScreen};
use debrid_streams::source::Backend;
use debrid_streams::store::AppState;
use debrid_streams::view::{ChannelView, EntryAction};

fn state_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("debrid-streams-screen-{}", std::process::id()))
        .join(name)
}

fn addon(server: &MockServer, prefix: &str) -> AddonClient {
    AddonClient::new(
        &format!("{}/{}/manifest.json", server.uri(), prefix),
        Duration::from_secs(5),
    )
}

async fn mount_streams(server: &MockServer, prefix: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/stream/movie/tt0133093.json", prefix)))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"{{"streams":[{{"name":"{}","title":"{}","url":"https://cdn/{}"}}]}}"#,
            prefix, title, prefix
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_select_source_researches_and_persists() {
    let mock_server = MockServer::start().await;
    mount_streams(&mock_server, "aio", "Matrix 1080p").await;
    mount_streams(&mock_server, "comet", "Matrix 2160p").await;

    let path = state_path("select.json");
    let _ = std::fs::remove_file(&path);

    let mut screen = StreamScreen::from_parts(
        vec![
            (Backend::AioStreams, addon(&mock_server, "aio")),
            (Backend::Comet, addon(&mock_server, "comet")),
        ],
        None,
        None,
        None,
        Some(path.clone()),
    );
    let mut view = ListController::new();

    screen
        .handle(
            ScreenCommand::Search(TitleMeta::movie("tt0133093", "The Matrix")),
            &mut view,
        )
        .await;

    assert_eq!(view.sources(), ["AIOStreams", "Comet"]);
    assert_eq!(view.active_source(), 0);
    assert_eq!(view.entries()[0].title(), "Matrix 1080p");

    screen.handle(ScreenCommand::SelectSource(1), &mut view).await;

    assert_eq!(screen.active_backend(), Some(Backend::Comet));
    assert_eq!(view.active_source(), 1);
    assert_eq!(view.entries()[0].title(), "Matrix 2160p");
    assert_eq!(AppState::load_from(&path).last_source.as_deref(), Some("comet"));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_last_source_is_restored() {
    let mock_server = MockServer::start().await;

    let screen = StreamScreen::from_parts(
        vec![
            (Backend::AioStreams, addon(&mock_server, "aio")),
            (Backend::Torrentio, addon(&mock_server, "torrentio")),
        ],
        None,
        None,
        Some("torrentio"),
        None,
    );
    assert_eq!(screen.active_backend(), Some(Backend::Torrentio));

    let unknown = StreamScreen::from_parts(
        vec![(Backend::Comet, addon(&mock_server, "comet"))],
        None,
        None,
        Some("aiostreams"),
        None,
    );
    assert_eq!(unknown.active_backend(), Some(Backend::Comet));
}

#[tokio::test]
async fn test_series_enriched_from_metadata_addon() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cinemeta/meta/series/tt0903747.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"meta":{"id":"tt0903747","type":"series","name":"Breaking Bad","videos":[
                {"season":1,"episode":7},{"season":2,"episode":13},{"season":3,"episode":13}
            ]}}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut screen = StreamScreen::from_parts(
        vec![(Backend::Comet, addon(&mock_server, "comet"))],
        None,
        Some(addon(&mock_server, "cinemeta")),
        None,
        None,
    );
    let mut view = ListController::new();

    // Known only by id, as from the lookup prompt
    let meta = TitleMeta {
        imdb_id: Some("tt0903747".into()),
        first_air_date: Some(String::new()),
        ..Default::default()
    };
    screen.handle(ScreenCommand::Search(meta), &mut view).await;

    assert_eq!(view.entries().len(), 3);
    assert_eq!(screen.active_source().map(|s| s.meta().title.as_str()), Some("Breaking Bad"));

    screen
        .handle(ScreenCommand::Open(EntryAction::Season(1)), &mut view)
        .await;
    assert_eq!(view.entries().len(), 7);
}

#[tokio::test]
async fn test_back_at_root_requests_exit() {
    let mock_server = MockServer::start().await;
    mount_streams(&mock_server, "aio", "Matrix 720p").await;

    let mut screen = StreamScreen::from_parts(
        vec![(Backend::AioStreams, addon(&mock_server, "aio"))],
        None,
        None,
        None,
        None,
    );
    let mut view = ListController::new();

    screen
        .handle(
            ScreenCommand::Search(TitleMeta::movie("tt0133093", "The Matrix")),
            &mut view,
        )
        .await;
    assert!(screen.handle(ScreenCommand::Back, &mut view).await);
    assert!(view.take_exit());

    assert!(!screen.handle(ScreenCommand::Destroy, &mut view).await);
}

#[tokio::test]
async fn test_spawned_screen_renders_through_channel() {
    let mock_server = MockServer::start().await;
    mount_streams(&mock_server, "aio", "Matrix 1080p").await;

    let screen = StreamScreen::from_parts(
        vec![(Backend::AioStreams, addon(&mock_server, "aio"))],
        None,
        None,
        None,
        None,
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = screen.spawn(ChannelView::new(tx));
    handle.send(ScreenCommand::Search(TitleMeta::movie("tt0133093", "The Matrix")));

    let mut view = ListController::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while view.stream_count() == 0 {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .expect("timed out waiting for streams")
            .expect("screen closed early");
        view.apply(event);
    }

    assert_eq!(view.entries()[0].title(), "Matrix 1080p");
    assert!(!handle.is_loading());
    handle.close();
}
