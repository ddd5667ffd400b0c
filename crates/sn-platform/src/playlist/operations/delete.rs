//! Delete Playlist Use Case

use std::sync::Arc;

use tracing::info;

use super::lock_owned;
use crate::playlist::repository::PlaylistRepository;
use crate::shared::error::Result;
use crate::usecase::{ExecutionContext, PgUnitOfWork};

#[derive(Debug, Clone, Copy)]
pub struct DeletePlaylistCommand {
    pub id: i64,
}

pub struct DeletePlaylistUseCase {
    uow: PgUnitOfWork,
    playlists: Arc<PlaylistRepository>,
}

impl DeletePlaylistUseCase {
    pub fn new(uow: PgUnitOfWork, playlists: Arc<PlaylistRepository>) -> Self {
        Self { uow, playlists }
    }

    /// Removes likes, owners, memberships and the row. The cover blob stays;
    /// other entities may share it.
    pub async fn execute(&self, ctx: &ExecutionContext, command: DeletePlaylistCommand) -> Result<()> {
        let caller = ctx.require_caller()?;

        let mut tx = self.uow.begin().await?;
        lock_owned(&self.playlists, &mut *tx, command.id, caller.id).await?;
        self.playlists.delete(Some(&mut *tx), command.id).await?;
        tx.commit().await?;

        info!(playlist_id = command.id, user_id = caller.id, "Playlist deleted");
        Ok(())
    }
}
