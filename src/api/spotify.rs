use super::{MusicService, Page};
use crate::cancel::CancelFlag;
use crate::error::ServiceError;
use crate::models::{BatchResult, PlaylistHandle, TimeWindow, TrackRef};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::time::Duration;

/// Authenticated session for one invocation. Supplied by the external OAuth
/// collaborator; this crate never refreshes or persists it.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Retry bounds for the transient failure classes (429, 5xx, network).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait before the first retry; doubled per subsequent attempt.
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff for the given 1-based attempt, capped.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(6);
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Service client backed by the Spotify Web API.
/// The API base may be overridden via the constructor or the
/// SPOTIFY_API_BASE env var (useful for tests).
pub struct SpotifyClient {
    client: Client,
    session: Session,
    retry: RetryPolicy,
    cancel: CancelFlag,
    api_base: String,
    request_timeout: Duration,
    user_id: tokio::sync::Mutex<Option<String>>,
}

impl SpotifyClient {
    pub fn new(session: Session, retry: RetryPolicy, cancel: CancelFlag) -> Self {
        let base = env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into());
        Self::with_api_base(session, retry, cancel, base)
    }

    /// Point the client at a different API root (tests pass a local mock
    /// server URL here).
    pub fn with_api_base(
        session: Session,
        retry: RetryPolicy,
        cancel: CancelFlag,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            session,
            retry,
            cancel,
            api_base: api_base.into(),
            request_timeout: Duration::from_secs(30),
            user_id: tokio::sync::Mutex::new(None),
        }
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Issue one authenticated request, retrying transient failures up to the
    /// policy bound. The HTTP connection is scoped to the call; reqwest
    /// releases it on every exit path, including timeouts.
    ///
    /// - 429: wait the server's retry-after (or the policy backoff), retry.
    ///   Exhaustion surfaces RateLimitExhausted.
    /// - 5xx: exponential backoff, retry. Exhaustion surfaces ServiceUnavailable.
    /// - other 4xx: RequestRejected immediately, no retry.
    /// - network/timeout: retry, then ConnectionFailed.
    ///
    /// The cancellation flag is checked before every attempt.
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, ServiceError> {
        let url = format!("{}{}", self.api_base, path);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if self.cancel.is_cancelled() {
                return Err(ServiceError::Cancelled);
            }

            let mut req = self
                .client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, self.session.bearer())
                .timeout(self.request_timeout);
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(b) = &body {
                req = req.header(CONTENT_TYPE, "application/json").json(b);
            }

            let resp = match req.send().await {
                Ok(r) => r,
                Err(e) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(ServiceError::ConnectionFailed {
                            attempts: attempt,
                            message: e.to_string(),
                        });
                    }
                    let wait = self.retry.backoff(attempt);
                    warn!("{} {} failed ({}); retrying in {:?}", method, url, e, wait);
                    tokio::time::sleep(wait).await;
                    continue;
                }
            };

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.retry.max_attempts {
                    return Err(ServiceError::RateLimitExhausted { attempts: attempt });
                }
                let wait = retry_after(&resp).unwrap_or_else(|| self.retry.backoff(attempt));
                warn!("rate limited on {}; waiting {:?} before retry", url, wait);
                tokio::time::sleep(wait).await;
                continue;
            }
            if status.is_server_error() {
                if attempt >= self.retry.max_attempts {
                    return Err(ServiceError::ServiceUnavailable {
                        status: status.as_u16(),
                        attempts: attempt,
                    });
                }
                let wait = self.retry.backoff(attempt);
                warn!("{} from {}; retrying in {:?}", status, url, wait);
                tokio::time::sleep(wait).await;
                continue;
            }
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(ServiceError::RequestRejected {
                    status: status.as_u16(),
                    body: text,
                });
            }

            return resp.json().await.map_err(|e| ServiceError::RequestRejected {
                status: status.as_u16(),
                body: format!("unexpected response shape: {}", e),
            });
        }
    }

    /// Current user id, fetched once per invocation and memoized.
    async fn current_user_id(&self) -> Result<String, ServiceError> {
        let mut guard = self.user_id.lock().await;
        if let Some(id) = guard.as_ref() {
            return Ok(id.clone());
        }
        let v = self.request(Method::GET, "/me", &[], None).await?;
        let user: UserObject = parse(v)?;
        debug!("resolved current user id {}", user.id);
        *guard = Some(user.id.clone());
        Ok(user.id)
    }
}

fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Validate a response body against the endpoint's expected shape.
/// A mismatch is a contract violation, surfaced as RequestRejected rather
/// than propagated as raw JSON.
fn parse<T: DeserializeOwned>(v: serde_json::Value) -> Result<T, ServiceError> {
    serde_json::from_value(v).map_err(|e| ServiceError::RequestRejected {
        status: 200,
        body: format!("unexpected response shape: {}", e),
    })
}

#[derive(Debug, Deserialize)]
struct PagingObject<T> {
    items: Vec<T>,
    total: usize,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    uri: String,
    name: String,
    artists: Vec<ArtistObject>,
}

impl From<TrackObject> for TrackRef {
    fn from(t: TrackObject) -> Self {
        TrackRef {
            uri: t.uri,
            title: t.name,
            artists: t.artists.into_iter().map(|a| a.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistTracksField {
    total: usize,
}

#[derive(Debug, Deserialize)]
struct PlaylistObject {
    id: String,
    name: String,
    tracks: PlaylistTracksField,
}

impl From<PlaylistObject> for PlaylistHandle {
    fn from(p: PlaylistObject) -> Self {
        PlaylistHandle {
            id: p.id,
            name: p.name,
            track_count: p.tracks.total,
        }
    }
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct SnapshotObject {
    snapshot_id: String,
}

#[async_trait]
impl MusicService for SpotifyClient {
    async fn top_tracks_page(
        &self,
        window: TimeWindow,
        limit: usize,
        offset: usize,
    ) -> Result<Page<TrackRef>, ServiceError> {
        let query = [
            ("time_range", window.as_time_range().to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        let v = self.request(Method::GET, "/me/top/tracks", &query, None).await?;
        let page: PagingObject<TrackObject> = parse(v)?;
        Ok(Page {
            items: page.items.into_iter().map(TrackRef::from).collect(),
            total: page.total,
        })
    }

    async fn playlists_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Page<PlaylistHandle>, ServiceError> {
        let query = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let v = self.request(Method::GET, "/me/playlists", &query, None).await?;
        let page: PagingObject<PlaylistObject> = parse(v)?;
        Ok(Page {
            items: page.items.into_iter().map(PlaylistHandle::from).collect(),
            total: page.total,
        })
    }

    async fn create_playlist(
        &self,
        name: &str,
        public: bool,
        description: &str,
    ) -> Result<PlaylistHandle, ServiceError> {
        let user_id = self.current_user_id().await?;
        let path = format!("/users/{}/playlists", urlencoding::encode(&user_id));
        let body = json!({
            "name": name,
            "public": public,
            "description": description,
        });
        let v = self.request(Method::POST, &path, &[], Some(body)).await?;
        let created: PlaylistObject = parse(v)?;
        Ok(created.into())
    }

    async fn add_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<BatchResult, ServiceError> {
        let path = format!("/playlists/{}/tracks", playlist_id);
        let body = json!({ "uris": uris });
        let v = self.request(Method::POST, &path, &[], Some(body)).await?;
        // The service commits a batch atomically; a snapshot id in the
        // response means every URI in the call was accepted.
        let _snapshot: SnapshotObject = parse(v)?;
        Ok(BatchResult {
            accepted: uris.len(),
            failed: Vec::new(),
        })
    }

    async fn get_playlist(&self, playlist_id: &str) -> Result<PlaylistHandle, ServiceError> {
        let path = format!("/playlists/{}", playlist_id);
        let v = self.request(Method::GET, &path, &[], None).await?;
        let playlist: PlaylistObject = parse(v)?;
        Ok(playlist.into())
    }

    fn name(&self) -> &str {
        "spotify"
    }
}
