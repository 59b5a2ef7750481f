use crate::api::{MusicService, MAX_PAGE_SIZE};
use crate::error::AggregateError;
use crate::models::{TimeWindow, TrackRef};
use log::{debug, warn};

/// Fetch the listener's ranked top tracks for the given window.
///
/// `limit` below 1 is rejected before any network call. Values above the
/// service page maximum (50) are capped, not rejected; callers asking for
/// more simply get a capped result. Rank order is preserved exactly as the
/// service returns it; no re-sort, no dedup. A source with fewer tracks
/// than requested yields the shorter sequence, which is not an error.
pub async fn fetch_top_tracks(
    service: &dyn MusicService,
    window: TimeWindow,
    limit: usize,
) -> Result<Vec<TrackRef>, AggregateError> {
    if limit < 1 {
        return Err(AggregateError::InvalidLimit(limit));
    }
    let capped = limit.min(MAX_PAGE_SIZE);
    if capped < limit {
        warn!(
            "requested {} tracks; capping at service maximum {}",
            limit, MAX_PAGE_SIZE
        );
    }

    let mut tracks: Vec<TrackRef> = Vec::with_capacity(capped);
    loop {
        let want = capped - tracks.len();
        let page = service
            .top_tracks_page(window, want.min(MAX_PAGE_SIZE), tracks.len())
            .await?;
        let fetched = page.items.len();
        let total = page.total;
        tracks.extend(page.items);
        if tracks.len() >= capped || fetched == 0 || tracks.len() >= total {
            break;
        }
    }
    tracks.truncate(capped);

    debug!("aggregated {} ranked tracks", tracks.len());
    Ok(tracks)
}
