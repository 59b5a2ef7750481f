use crate::aggregator;
use crate::api::MusicService;
use crate::cancel::CancelFlag;
use crate::error::GenerationError;
use crate::models::{GenerationRequest, PlaylistHandle};
use crate::resolver;
use crate::writer;
use log::info;

/// Run the full pipeline for one request: aggregate ranked tracks, resolve
/// the target playlist against remote state, materialize the result. One
/// invocation drives one linear, sequential pass; retry waits inside the
/// service client are the only suspensions.
pub async fn generate(
    service: &dyn MusicService,
    request: &GenerationRequest,
    cancel: &CancelFlag,
    batch_size: usize,
) -> Result<PlaylistHandle, GenerationError> {
    info!(
        "generating playlist {:?} ({} tracks, {} window) via {}",
        request.name,
        request.limit,
        request.window.as_time_range(),
        service.name()
    );

    let tracks = aggregator::fetch_top_tracks(service, request.window, request.limit).await?;
    info!("aggregated {} candidate tracks", tracks.len());

    let resolution = resolver::resolve(service, &request.name, request.on_existing).await?;

    let handle =
        writer::materialize(service, resolution, request, &tracks, cancel, batch_size).await?;
    info!(
        "playlist {:?} now holds {} tracks (id {})",
        handle.name, handle.track_count, handle.id
    );
    Ok(handle)
}
