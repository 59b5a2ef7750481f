use crate::models::TrackRef;
use thiserror::Error;

/// Failures surfaced by the service client. Transient classes are retried
/// inside the client up to the configured bound before these are returned.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("rate limit retries exhausted after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("service unavailable (last status {status}) after {attempts} attempts")]
    ServiceUnavailable { status: u16, attempts: u32 },

    #[error("connection failed after {attempts} attempts: {message}")]
    ConnectionFailed { attempts: u32, message: String },

    /// Client error (4xx other than 429) or a response whose shape does not
    /// match the endpoint contract. Never retried.
    #[error("request rejected: {status} => {body}")]
    RequestRejected { status: u16, body: String },

    #[error("cancelled")]
    Cancelled,
}

/// Failures surfaced by the track aggregator.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("invalid track limit {0}: must be at least 1")]
    InvalidLimit(usize),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Failures surfaced by the playlist resolver.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("a playlist named {name:?} already exists")]
    PlaylistNameExists { name: String },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Failures surfaced by the playlist writer. Partial progress is always
/// reported exactly: `added_count` tracks are committed on the remote
/// playlist, `failed_tracks` are not, and the caller may retry only those.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("partial write: {added_count} tracks committed before failure")]
    PartialWrite {
        added_count: usize,
        failed_tracks: Vec<TrackRef>,
        #[source]
        cause: ServiceError,
    },

    #[error("cancelled after committing {added_count} tracks")]
    Cancelled { added_count: usize },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Top-level pipeline error.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Write(#[from] WriteError),
}
