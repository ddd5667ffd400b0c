//! Upload Playlist Cover Use Case

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use super::ensure_owner;
use crate::blob::BlobStore;
use crate::playlist::repository::PlaylistRepository;
use crate::shared::error::Result;
use crate::shared::file::{store_upload, UploadPolicy};
use crate::usecase::ExecutionContext;

pub struct UploadPlaylistCoverCommand {
    pub id: i64,
    pub data: Bytes,
}

pub struct UploadPlaylistCoverUseCase {
    playlists: Arc<PlaylistRepository>,
    blobs: Arc<dyn BlobStore>,
    policy: UploadPolicy,
}

impl UploadPlaylistCoverUseCase {
    pub fn new(playlists: Arc<PlaylistRepository>, blobs: Arc<dyn BlobStore>, policy: UploadPolicy) -> Self {
        Self {
            playlists,
            blobs,
            policy,
        }
    }

    /// The cover column changes only after the blob is stored. Returns the
    /// stored path.
    pub async fn execute(&self, ctx: &ExecutionContext, command: UploadPlaylistCoverCommand) -> Result<String> {
        let caller = ctx.require_caller()?;
        ensure_owner(&self.playlists, None, command.id, caller.id).await?;

        let stored = store_upload(self.blobs.as_ref(), &self.policy, command.data).await?;
        self.playlists.update_cover(None, command.id, &stored.path).await?;

        info!(
            playlist_id = command.id,
            path = %stored.path,
            created = stored.created,
            "Playlist cover updated"
        );
        Ok(stored.path)
    }
}
