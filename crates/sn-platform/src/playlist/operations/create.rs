//! Create Playlist Use Case

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::info;

use crate::playlist::entity::PlaylistInfo;
use crate::playlist::repository::PlaylistRepository;
use crate::shared::error::Result;
use crate::usecase::{ExecutionContext, PgUnitOfWork};
use crate::user::agent::UserAgent;

#[derive(Debug, Clone)]
pub struct CreatePlaylistCommand {
    pub name: String,
    pub description: Option<String>,
    /// Users bound as owners next to the caller.
    pub co_owners: Vec<i64>,
}

pub struct CreatePlaylistUseCase {
    uow: PgUnitOfWork,
    playlists: Arc<PlaylistRepository>,
    users: Arc<dyn UserAgent>,
}

impl CreatePlaylistUseCase {
    pub fn new(uow: PgUnitOfWork, playlists: Arc<PlaylistRepository>, users: Arc<dyn UserAgent>) -> Self {
        Self { uow, playlists, users }
    }

    /// Returns the new playlist id.
    pub async fn execute(&self, ctx: &ExecutionContext, command: CreatePlaylistCommand) -> Result<i64> {
        let caller = ctx.require_caller()?;

        let info = PlaylistInfo {
            name: command.name,
            description: command.description,
        };
        info.validate()?;

        let mut owners = vec![caller.id];
        for user_id in command.co_owners {
            if !owners.contains(&user_id) {
                owners.push(user_id);
            }
        }
        try_join_all(owners[1..].iter().map(|id| self.users.get_user(ctx, *id))).await?;

        let mut tx = self.uow.begin().await?;
        let id = self.playlists.insert(Some(&mut *tx), &info).await?;
        self.playlists.add_owners(Some(&mut *tx), id, &owners).await?;
        tx.commit().await?;

        info!(playlist_id = id, user_id = caller.id, owners = owners.len(), "Playlist created");
        Ok(id)
    }
}
