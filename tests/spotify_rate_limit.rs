use mockito::Server;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use music_top_tracks_playlist_gen::api::spotify::{RetryPolicy, Session, SpotifyClient};
use music_top_tracks_playlist_gen::api::MusicService;
use music_top_tracks_playlist_gen::cancel::CancelFlag;
use music_top_tracks_playlist_gen::error::ServiceError;

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
fn rate_limited_past_bound_surfaces_rate_limit_exhausted() {
    let mut server = Server::new();
    let m = server
        .mock("GET", "/playlists/pl1")
        .with_status(429)
        .with_header("retry-after", "0")
        .with_body(r#"{"error":"rate_limited"}"#)
        .expect(3)
        .create();

    let base = server.url();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let res = rt.block_on(async move { test_client(&base).get_playlist("pl1").await });

    match res {
        Err(ServiceError::RateLimitExhausted { attempts }) => assert_eq!(attempts, 3),
        other => panic!("expected RateLimitExhausted, got {:?}", other),
    }
    // Exactly the retry bound, no further calls.
    m.assert();
}

#[test]
fn rate_limited_twice_then_success_takes_exactly_three_calls() {
    let body = serde_json::json!({
        "id": "pl1",
        "name": "Jul 2026",
        "tracks": { "total": 3 }
    })
    .to_string();
    let too_many = http_response("429 Too Many Requests", "retry-after: 0\r\n", "");
    let ok = http_response("200 OK", "content-type: application/json\r\n", &body);
    let (base, server) = scripted_server(vec![too_many.clone(), too_many, ok]);

    let rt = tokio::runtime::Runtime::new().unwrap();
    let res = rt.block_on(async move { test_client(&base).get_playlist("pl1").await });

    let handle = res.unwrap();
    assert_eq!(handle.id, "pl1");
    assert_eq!(handle.track_count, 3);
    assert_eq!(server.join().unwrap(), 3);
}

#[test]
fn client_error_is_not_retried() {
    let mut server = Server::new();
    let m = server
        .mock("GET", "/playlists/pl1")
        .with_status(403)
        .with_body(r#"{"error":"forbidden"}"#)
        .expect(1)
        .create();

    let base = server.url();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let res = rt.block_on(async move { test_client(&base).get_playlist("pl1").await });

    match res {
        Err(ServiceError::RequestRejected { status, body }) => {
            assert_eq!(status, 403);
            assert!(body.contains("forbidden"));
        }
        other => panic!("expected RequestRejected, got {:?}", other),
    }
    m.assert();
}

#[test]
fn server_errors_are_retried_then_surface_service_unavailable() {
    let mut server = Server::new();
    let m = server
        .mock("GET", "/playlists/pl1")
        .with_status(502)
        .with_body("bad gateway")
        .expect(3)
        .create();

    let base = server.url();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let res = rt.block_on(async move { test_client(&base).get_playlist("pl1").await });

    match res {
        Err(ServiceError::ServiceUnavailable { status, attempts }) => {
            assert_eq!(status, 502);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected ServiceUnavailable, got {:?}", other),
    }
    m.assert();
}

#[test]
fn unreachable_service_surfaces_connection_failed() {
    // Nothing listens on this port.
    let rt = tokio::runtime::Runtime::new().unwrap();
    let res = rt.block_on(async move {
        test_client("http://127.0.0.1:9").get_playlist("pl1").await
    });
    match res {
        Err(ServiceError::ConnectionFailed { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected ConnectionFailed, got {:?}", other),
    }
}

#[test]
fn unexpected_response_shape_is_rejected_not_propagated() {
    let mut server = Server::new();
    let _m = server
        .mock("GET", "/playlists/pl1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"nothing": "useful"}"#)
        .create();

    let base = server.url();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let res = rt.block_on(async move { test_client(&base).get_playlist("pl1").await });

    match res {
        Err(ServiceError::RequestRejected { body, .. }) => {
            assert!(body.contains("unexpected response shape"))
        }
        other => panic!("expected RequestRejected, got {:?}", other),
    }
}

#[test]
fn cancelled_client_issues_no_requests() {
    let mut server = Server::new();
    let m = server
        .mock("GET", "/playlists/pl1")
        .with_status(200)
        .with_body("{}")
        .expect(0)
        .create();

    let base = server.url();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let client = SpotifyClient::with_api_base(
        Session::new("test-token"),
        RetryPolicy::default(),
        cancel,
        base,
    );

    let rt = tokio::runtime::Runtime::new().unwrap();
    let res = rt.block_on(async move { client.get_playlist("pl1").await });
    assert!(matches!(res, Err(ServiceError::Cancelled)));
    m.assert();
}

/// Minimal scripted HTTP responder for response sequences mockito cannot
/// express (same route answering differently per attempt). Serves one
/// response per connection, then stops; returns the number served.
fn scripted_server(responses: Vec<String>) -> (String, thread::JoinHandle<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut served = 0usize;
        for response in responses {
            let (mut stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => break,
            };
            // Drain the request head; these requests carry no body.
            let mut buf = [0u8; 4096];
            let mut head: Vec<u8> = Vec::new();
            loop {
                match stream.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        head.extend_from_slice(&buf[..n]);
                        if head.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            if stream.write_all(response.as_bytes()).is_ok() {
                served += 1;
            }
        }
        served
    });
    (format!("http://{}", addr), handle)
}

fn http_response(status_line: &str, extra_headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\n{}content-length: {}\r\nconnection: close\r\n\r\n{}",
        status_line,
        extra_headers,
        body.len(),
        body
    )
}
