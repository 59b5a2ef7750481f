use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

use music_top_tracks_playlist_gen::api::spotify::{RetryPolicy, Session, SpotifyClient};
use music_top_tracks_playlist_gen::api::MusicService;
use music_top_tracks_playlist_gen::cancel::CancelFlag;
use music_top_tracks_playlist_gen::error::ServiceError;
use music_top_tracks_playlist_gen::models::TimeWindow;

fn test_client(base: &str) -> SpotifyClient {
    SpotifyClient::with_api_base(
        Session::new("test-token"),
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(20),
        },
        CancelFlag::new(),
        base,
    )
}

#[test]
fn top_tracks_page_parses_typed_fields() {
    let mut server = Server::new();
    let _m = server
        .mock("GET", "/me/top/tracks")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    {
                        "uri": "spotify:track:1",
                        "name": "First Song",
                        "artists": [{ "name": "Some Band" }, { "name": "A Guest" }]
                    },
                    {
                        "uri": "spotify:track:2",
                        "name": "Second Song",
                        "artists": [{ "name": "Some Band" }]
                    }
                ],
                "total": 2
            })
            .to_string(),
        )
        .create();

    let base = server.url();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let page = rt
        .block_on(async move {
            test_client(&base)
                .top_tracks_page(TimeWindow::Medium, 2, 0)
                .await
        })
        .unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].uri, "spotify:track:1");
    assert_eq!(page.items[0].title, "First Song");
    assert_eq!(page.items[0].artists, vec!["Some Band", "A Guest"]);
}

#[test]
fn playlists_page_parses_items_and_total() {
    let mut server = Server::new();
    let _m = server
        .mock("GET", "/me/playlists")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    { "id": "pl1", "name": "Jun 2026", "tracks": { "total": 50 } },
                    { "id": "pl2", "name": "Jul 2026", "tracks": { "total": 12 } }
                ],
                "total": 61
            })
            .to_string(),
        )
        .create();

    let base = server.url();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let page = rt
        .block_on(async move { test_client(&base).playlists_page(50, 0).await })
        .unwrap();

    assert_eq!(page.total, 61);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[1].name, "Jul 2026");
    assert_eq!(page.items[1].track_count, 12);
}

#[test]
fn create_playlist_resolves_the_user_id_once() {
    let mut server = Server::new();
    let m_me = server
        .mock("GET", "/me")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "mock_user" }).to_string())
        .expect(1)
        .create();
    let m_create = server
        .mock("POST", "/users/mock_user/playlists")
        .match_body(Matcher::PartialJson(json!({
            "name": "Jul 2026",
            "public": true
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "id": "pl_new", "name": "Jul 2026", "tracks": { "total": 0 } }).to_string(),
        )
        .expect(2)
        .create();

    let base = server.url();
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async move {
        let client = test_client(&base);
        let first = client
            .create_playlist("Jul 2026", true, "desc")
            .await
            .unwrap();
        assert_eq!(first.id, "pl_new");
        assert_eq!(first.track_count, 0);
        // Second create reuses the memoized user id.
        client.create_playlist("Jul 2026", true, "desc").await.unwrap();
    });

    m_me.assert();
    m_create.assert();
}

#[test]
fn add_tracks_sends_uris_in_order_and_reports_acceptance() {
    let mut server = Server::new();
    let m = server
        .mock("POST", "/playlists/pl1/tracks")
        .match_body(Matcher::Json(json!({
            "uris": ["spotify:track:1", "spotify:track:2"]
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "snapshot_id": "s1" }).to_string())
        .create();

    let base = server.url();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let batch = rt
        .block_on(async move {
            test_client(&base)
                .add_tracks(
                    "pl1",
                    &["spotify:track:1".to_string(), "spotify:track:2".to_string()],
                )
                .await
        })
        .unwrap();

    assert_eq!(batch.accepted, 2);
    assert!(batch.failed.is_empty());
    m.assert();
}

#[test]
fn get_playlist_reports_the_remote_track_count() {
    let mut server = Server::new();
    let _m = server
        .mock("GET", "/playlists/pl1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "id": "pl1", "name": "Jul 2026", "tracks": { "total": 73 } }).to_string(),
        )
        .create();

    let base = server.url();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let handle = rt
        .block_on(async move { test_client(&base).get_playlist("pl1").await })
        .unwrap();

    assert_eq!(handle.track_count, 73);
}

#[test]
fn expired_token_surfaces_request_rejected_without_retry() {
    let mut server = Server::new();
    let m = server
        .mock("GET", "/playlists/pl1")
        .with_status(401)
        .with_body(r#"{"error":{"status":401,"message":"The access token expired"}}"#)
        .expect(1)
        .create();

    let base = server.url();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let res = rt.block_on(async move { test_client(&base).get_playlist("pl1").await });

    match res {
        Err(ServiceError::RequestRejected { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected RequestRejected, got {:?}", other),
    }
    m.assert();
}
