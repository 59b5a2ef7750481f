use crate::api::{MusicService, MAX_PAGE_SIZE};
use crate::error::ResolutionError;
use crate::models::{CollisionPolicy, Resolution};
use log::{debug, info};

/// Search the caller's playlists for an exact, case-sensitive name match and
/// apply the collision policy.
///
/// The existence check here and a later create in the writer are not atomic
/// as a pair: two concurrent invocations against one account can still end
/// up with duplicate playlists. Accepted limitation; callers needing
/// exclusion must serialize invocations themselves.
pub async fn resolve(
    service: &dyn MusicService,
    name: &str,
    policy: CollisionPolicy,
) -> Result<Resolution, ResolutionError> {
    let mut offset = 0usize;
    let found = loop {
        let page = service.playlists_page(MAX_PAGE_SIZE, offset).await?;
        if let Some(existing) = page.items.iter().find(|p| p.name == name) {
            break Some(existing.clone());
        }
        offset += page.items.len();
        if page.items.is_empty() || offset >= page.total {
            break None;
        }
    };

    match found {
        None => {
            debug!("no playlist named {:?}; will create", name);
            Ok(Resolution::CreateNew)
        }
        Some(existing) => match policy {
            CollisionPolicy::Reject => Err(ResolutionError::PlaylistNameExists {
                name: name.to_string(),
            }),
            CollisionPolicy::Reuse => {
                info!("reusing existing playlist {:?} (id {})", name, existing.id);
                Ok(Resolution::Existing(existing))
            }
            CollisionPolicy::AllowDuplicate => {
                info!("playlist {:?} exists; creating a duplicate as requested", name);
                Ok(Resolution::CreateNew)
            }
        },
    }
}
