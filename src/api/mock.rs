use super::{MusicService, Page};
use crate::error::ServiceError;
use crate::models::{BatchResult, PlaylistHandle, TimeWindow, TrackRef};
use async_trait::async_trait;
use log::info;
use std::sync::Mutex;

/// Per-operation call counters, for call-count assertions in tests.
#[derive(Debug, Default, Clone)]
pub struct CallCounts {
    pub top_tracks: u32,
    pub playlists: u32,
    pub create: u32,
    pub add: u32,
    pub get: u32,
}

#[derive(Debug, Clone)]
struct MockPlaylist {
    id: String,
    name: String,
    uris: Vec<String>,
}

/// An in-memory service used in tests and for --dry-run runs. Seedable with
/// a ranked library and pre-existing playlists; add calls can be made to
/// fail after a set number of successes.
pub struct MockService {
    top_tracks: Vec<TrackRef>,
    playlists: Mutex<Vec<MockPlaylist>>,
    counts: Mutex<CallCounts>,
    next_id: Mutex<u32>,
    fail_adds_after: Option<u32>,
    adds_succeeded: Mutex<u32>,
    last_top_page: Mutex<Option<(usize, usize)>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            top_tracks: Vec::new(),
            playlists: Mutex::new(Vec::new()),
            counts: Mutex::new(CallCounts::default()),
            next_id: Mutex::new(0),
            fail_adds_after: None,
            adds_succeeded: Mutex::new(0),
            last_top_page: Mutex::new(None),
        }
    }

    /// A deterministic ranked library of `n` fake tracks.
    pub fn with_library(n: usize) -> Self {
        Self::with_top_tracks((0..n).map(fake_track).collect())
    }

    pub fn with_top_tracks(tracks: Vec<TrackRef>) -> Self {
        let mut svc = Self::new();
        svc.top_tracks = tracks;
        svc
    }

    /// Make add_tracks fail (as if the service had gone away) once `n`
    /// calls have succeeded.
    pub fn fail_adds_after(mut self, n: u32) -> Self {
        self.fail_adds_after = Some(n);
        self
    }

    /// Seed a pre-existing playlist and return its handle.
    pub fn seed_playlist(&self, name: &str, uris: Vec<String>) -> PlaylistHandle {
        let id = self.mint_id();
        let handle = PlaylistHandle {
            id: id.clone(),
            name: name.to_string(),
            track_count: uris.len(),
        };
        self.playlists.lock().unwrap().push(MockPlaylist {
            id,
            name: name.to_string(),
            uris,
        });
        handle
    }

    pub fn counts(&self) -> CallCounts {
        self.counts.lock().unwrap().clone()
    }

    /// (limit, offset) of the most recent top-tracks page request.
    pub fn last_top_page(&self) -> Option<(usize, usize)> {
        *self.last_top_page.lock().unwrap()
    }

    pub fn playlist_count(&self) -> usize {
        self.playlists.lock().unwrap().len()
    }

    /// URIs currently stored for the given playlist id.
    pub fn tracks_of(&self, playlist_id: &str) -> Option<Vec<String>> {
        self.playlists
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == playlist_id)
            .map(|p| p.uris.clone())
    }

    fn mint_id(&self) -> String {
        let mut n = self.next_id.lock().unwrap();
        *n += 1;
        format!("mock-playlist-{}", n)
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

fn fake_track(i: usize) -> TrackRef {
    TrackRef {
        uri: format!("mock:track:{}", i),
        title: format!("Track {}", i),
        artists: vec![format!("Artist {}", i % 7)],
    }
}

fn page_of<T: Clone>(items: &[T], limit: usize, offset: usize) -> Page<T> {
    let total = items.len();
    let end = offset.saturating_add(limit).min(total);
    let slice = if offset >= total { &[][..] } else { &items[offset..end] };
    Page {
        items: slice.to_vec(),
        total,
    }
}

#[async_trait]
impl MusicService for MockService {
    async fn top_tracks_page(
        &self,
        _window: TimeWindow,
        limit: usize,
        offset: usize,
    ) -> Result<Page<TrackRef>, ServiceError> {
        self.counts.lock().unwrap().top_tracks += 1;
        *self.last_top_page.lock().unwrap() = Some((limit, offset));
        Ok(page_of(&self.top_tracks, limit, offset))
    }

    async fn playlists_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Page<PlaylistHandle>, ServiceError> {
        self.counts.lock().unwrap().playlists += 1;
        let handles: Vec<PlaylistHandle> = self
            .playlists
            .lock()
            .unwrap()
            .iter()
            .map(|p| PlaylistHandle {
                id: p.id.clone(),
                name: p.name.clone(),
                track_count: p.uris.len(),
            })
            .collect();
        Ok(page_of(&handles, limit, offset))
    }

    async fn create_playlist(
        &self,
        name: &str,
        public: bool,
        _description: &str,
    ) -> Result<PlaylistHandle, ServiceError> {
        self.counts.lock().unwrap().create += 1;
        info!("MockService: create_playlist {} (public={})", name, public);
        Ok(self.seed_playlist(name, Vec::new()))
    }

    async fn add_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<BatchResult, ServiceError> {
        self.counts.lock().unwrap().add += 1;
        let mut succeeded = self.adds_succeeded.lock().unwrap();
        if let Some(bound) = self.fail_adds_after {
            if *succeeded >= bound {
                return Err(ServiceError::ServiceUnavailable {
                    status: 502,
                    attempts: 3,
                });
            }
        }
        let mut playlists = self.playlists.lock().unwrap();
        let playlist = playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| ServiceError::RequestRejected {
                status: 404,
                body: format!("no playlist {}", playlist_id),
            })?;
        playlist.uris.extend(uris.iter().cloned());
        *succeeded += 1;
        info!("MockService: add_tracks {} -> {} tracks", playlist_id, uris.len());
        Ok(BatchResult {
            accepted: uris.len(),
            failed: Vec::new(),
        })
    }

    async fn get_playlist(&self, playlist_id: &str) -> Result<PlaylistHandle, ServiceError> {
        self.counts.lock().unwrap().get += 1;
        self.playlists
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == playlist_id)
            .map(|p| PlaylistHandle {
                id: p.id.clone(),
                name: p.name.clone(),
                track_count: p.uris.len(),
            })
            .ok_or_else(|| ServiceError::RequestRejected {
                status: 404,
                body: format!("no playlist {}", playlist_id),
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
