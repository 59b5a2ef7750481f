pub mod spotify;
pub mod mock;

use crate::error::ServiceError;
use crate::models::{BatchResult, PlaylistHandle, TimeWindow, TrackRef};

/// Largest page the service will return for paginated listings, and the
/// ceiling on one invocation's requested track count.
pub const MAX_PAGE_SIZE: usize = 50;

/// Largest number of tracks the service accepts in one playlist-add call.
pub const MAX_BATCH_ADD: usize = 100;

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total items available on the remote side, as reported by the service.
    pub total: usize,
}

/// The four operation shapes the pipeline needs from the remote service,
/// plus a single-playlist re-fetch for ground-truth track counts.
/// Implementations: spotify::SpotifyClient and mock::MockService.
#[async_trait::async_trait]
pub trait MusicService: Send + Sync {
    /// One page of the listener's ranked track-play history, most played
    /// first. `limit` must not exceed MAX_PAGE_SIZE.
    async fn top_tracks_page(
        &self,
        window: TimeWindow,
        limit: usize,
        offset: usize,
    ) -> Result<Page<TrackRef>, ServiceError>;

    /// One page of the caller's playlists.
    async fn playlists_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Page<PlaylistHandle>, ServiceError>;

    /// Create a playlist and return its fresh handle.
    async fn create_playlist(
        &self,
        name: &str,
        public: bool,
        description: &str,
    ) -> Result<PlaylistHandle, ServiceError>;

    /// Append up to MAX_BATCH_ADD tracks in one call, preserving order.
    async fn add_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<BatchResult, ServiceError>;

    /// Re-fetch a playlist's current state.
    async fn get_playlist(&self, playlist_id: &str) -> Result<PlaylistHandle, ServiceError>;

    /// Service name (for logging).
    fn name(&self) -> &str;
}
