//! Update Playlist Use Case

use std::sync::Arc;

use tracing::info;

use super::lock_owned;
use crate::playlist::entity::PlaylistInfo;
use crate::playlist::repository::PlaylistRepository;
use crate::shared::error::Result;
use crate::usecase::{ExecutionContext, PgUnitOfWork};

#[derive(Debug, Clone)]
pub struct UpdatePlaylistCommand {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

pub struct UpdatePlaylistUseCase {
    uow: PgUnitOfWork,
    playlists: Arc<PlaylistRepository>,
}

impl UpdatePlaylistUseCase {
    pub fn new(uow: PgUnitOfWork, playlists: Arc<PlaylistRepository>) -> Self {
        Self { uow, playlists }
    }

    pub async fn execute(&self, ctx: &ExecutionContext, command: UpdatePlaylistCommand) -> Result<()> {
        let caller = ctx.require_caller()?;
        let info = PlaylistInfo {
            name: command.name,
            description: command.description,
        };
        info.validate()?;

        let mut tx = self.uow.begin().await?;
        lock_owned(&self.playlists, &mut *tx, command.id, caller.id).await?;
        self.playlists.update_info(Some(&mut *tx), command.id, &info).await?;
        tx.commit().await?;

        info!(playlist_id = command.id, user_id = caller.id, "Playlist info updated");
        Ok(())
    }
}
