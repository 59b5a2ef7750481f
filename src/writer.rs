use crate::api::{MusicService, MAX_BATCH_ADD};
use crate::cancel::CancelFlag;
use crate::error::{ServiceError, WriteError};
use crate::models::{GenerationRequest, PlaylistHandle, Resolution, TrackRef};
use log::info;

/// Create (or reuse) the target playlist and append `tracks` to it in
/// sequential batches, preserving order across batch boundaries.
///
/// Tracks committed by earlier batches are never rolled back: a failing
/// batch surfaces PartialWrite with the exact committed/failed partition so
/// the caller can retry only the failed subset. Cancellation is honored
/// between batch submissions and reported with committed progress. The
/// returned handle's track count is re-fetched from the service.
pub async fn materialize(
    service: &dyn MusicService,
    resolution: Resolution,
    request: &GenerationRequest,
    tracks: &[TrackRef],
    cancel: &CancelFlag,
    batch_size: usize,
) -> Result<PlaylistHandle, WriteError> {
    let batch_size = batch_size.clamp(1, MAX_BATCH_ADD);

    let handle = match resolution {
        Resolution::Existing(h) => h,
        Resolution::CreateNew => {
            let description = request.description.as_deref().unwrap_or("");
            let h = service
                .create_playlist(&request.name, request.public, description)
                .await?;
            info!("created playlist {:?} (id {})", h.name, h.id);
            h
        }
    };

    let mut added = 0usize;
    for chunk in tracks.chunks(batch_size) {
        if cancel.is_cancelled() {
            return Err(WriteError::Cancelled { added_count: added });
        }
        let uris: Vec<String> = chunk.iter().map(|t| t.uri.clone()).collect();
        match service.add_tracks(&handle.id, &uris).await {
            Ok(batch) => {
                added += batch.accepted;
                info!("added batch of {} tracks to {}", batch.accepted, handle.id);
            }
            Err(ServiceError::Cancelled) => {
                return Err(WriteError::Cancelled { added_count: added });
            }
            Err(cause) => {
                return Err(WriteError::PartialWrite {
                    added_count: added,
                    failed_tracks: tracks[added..].to_vec(),
                    cause,
                });
            }
        }
    }

    // Track count comes from the service, not local arithmetic: the playlist
    // may have been modified concurrently by something else.
    let refreshed = service.get_playlist(&handle.id).await?;
    Ok(refreshed)
}
