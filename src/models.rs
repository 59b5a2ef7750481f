use serde::{Deserialize, Serialize};

/// Listening-history window the ranking service supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeWindow {
    Short,
    Medium,
    Long,
}

impl TimeWindow {
    /// Wire value used by the remote top-tracks endpoint.
    pub fn as_time_range(&self) -> &'static str {
        match self {
            TimeWindow::Short => "short_term",
            TimeWindow::Medium => "medium_term",
            TimeWindow::Long => "long_term",
        }
    }

    /// Human-readable label, e.g. for generated descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::Short => "short",
            TimeWindow::Medium => "medium",
            TimeWindow::Long => "long",
        }
    }
}

/// What to do when a playlist with the requested name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Append to the existing playlist.
    Reuse,
    /// Fail the invocation.
    Reject,
    /// Create a second playlist sharing the name (the service permits this).
    AllowDuplicate,
}

/// A single ranked track as returned by the remote service. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    /// Opaque service-assigned identifier, e.g. "spotify:track:...".
    pub uri: String,
    pub title: String,
    pub artists: Vec<String>,
}

/// User intent for one generation run. Built once, immutable thereafter.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub name: String,
    /// Requested track count; intended domain 1..=50. Values above the
    /// service maximum are capped by the aggregator, values below 1 rejected.
    pub limit: usize,
    pub window: TimeWindow,
    pub public: bool,
    pub on_existing: CollisionPolicy,
    pub description: Option<String>,
}

impl GenerationRequest {
    pub fn new(name: impl Into<String>, limit: usize, window: TimeWindow) -> Self {
        Self {
            name: name.into(),
            limit,
            window,
            public: true,
            on_existing: CollisionPolicy::Reject,
            description: None,
        }
    }
}

/// A remote playlist as last observed. Never cached across invocations;
/// the writer re-fetches it after the final batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistHandle {
    pub id: String,
    pub name: String,
    pub track_count: usize,
}

/// Outcome of a single batched track-addition call. Consumed immediately
/// by the writer; `failed` is filled only when the service can attribute
/// rejects to individual tracks.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub accepted: usize,
    pub failed: Vec<TrackRef>,
}

/// Resolver outcome: reuse an existing playlist, or signal the writer to
/// create a fresh one.
#[derive(Debug, Clone)]
pub enum Resolution {
    Existing(PlaylistHandle),
    CreateNew,
}
