//! Playlist Operations
//!
//! Use cases for playlist management. Every transactional mutation opens
//! with the playlist row lock, so concurrent changes to one playlist run
//! one after another and each sees the rows its predecessor committed.

pub mod cover;
pub mod create;
pub mod delete;
pub mod owners;
pub mod query;
pub mod tracks;
pub mod update;

pub use cover::{UploadPlaylistCoverCommand, UploadPlaylistCoverUseCase};
pub use create::{CreatePlaylistCommand, CreatePlaylistUseCase};
pub use delete::{DeletePlaylistCommand, DeletePlaylistUseCase};
pub use owners::{AddPlaylistOwnerCommand, AddPlaylistOwnerUseCase};
pub use query::PlaylistQueries;
pub use tracks::{
    AddTrackCommand, AddTrackUseCase, RemoveTrackCommand, RemoveTrackUseCase, ReorderTrackCommand,
    ReorderTrackUseCase,
};
pub use update::{UpdatePlaylistCommand, UpdatePlaylistUseCase};

use sqlx::PgConnection;

use super::repository::PlaylistRepository;
use crate::shared::db::Tx;
use crate::shared::error::{PlatformError, Result};

/// `NotFound` for a missing playlist, `Forbidden` when `user_id` is not an owner.
pub(crate) async fn ensure_owner(playlists: &PlaylistRepository, mut tx: Tx<'_>, id: i64, user_id: i64) -> Result<()> {
    playlists.find_by_id(tx.as_deref_mut(), id).await?;
    owner_check(playlists, tx, id, user_id).await
}

/// Takes the playlist row lock as the first statement of `tx`, then checks
/// ownership. Must be called before any other read in the transaction.
pub(crate) async fn lock_owned(playlists: &PlaylistRepository, tx: &mut PgConnection, id: i64, user_id: i64) -> Result<()> {
    playlists.lock(Some(&mut *tx), id).await?;
    owner_check(playlists, Some(tx), id, user_id).await
}

async fn owner_check(playlists: &PlaylistRepository, tx: Tx<'_>, id: i64, user_id: i64) -> Result<()> {
    if !playlists.is_owner(tx, id, user_id).await? {
        return Err(PlatformError::forbidden("only playlist owners can change this playlist"));
    }
    Ok(())
}
