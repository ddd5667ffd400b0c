//! Add Playlist Owner Use Case

use std::sync::Arc;

use tracing::info;

use super::lock_owned;
use crate::playlist::repository::PlaylistRepository;
use crate::shared::error::Result;
use crate::usecase::{ExecutionContext, PgUnitOfWork};
use crate::user::agent::UserAgent;

#[derive(Debug, Clone, Copy)]
pub struct AddPlaylistOwnerCommand {
    pub playlist_id: i64,
    pub user_id: i64,
}

pub struct AddPlaylistOwnerUseCase {
    uow: PgUnitOfWork,
    playlists: Arc<PlaylistRepository>,
    users: Arc<dyn UserAgent>,
}

impl AddPlaylistOwnerUseCase {
    pub fn new(uow: PgUnitOfWork, playlists: Arc<PlaylistRepository>, users: Arc<dyn UserAgent>) -> Self {
        Self { uow, playlists, users }
    }

    /// Returns false when the user already owned the playlist.
    pub async fn execute(&self, ctx: &ExecutionContext, command: AddPlaylistOwnerCommand) -> Result<bool> {
        let caller = ctx.require_caller()?;
        self.users.get_user(ctx, command.user_id).await?;

        let mut tx = self.uow.begin().await?;
        lock_owned(&self.playlists, &mut *tx, command.playlist_id, caller.id).await?;
        let added = self
            .playlists
            .add_owners(Some(&mut *tx), command.playlist_id, &[command.user_id])
            .await?
            == 1;
        tx.commit().await?;

        info!(
            playlist_id = command.playlist_id,
            user_id = command.user_id,
            added,
            "Playlist owner added"
        );
        Ok(added)
    }
}
