//! Playlist track membership: add, remove, reorder.

use std::sync::Arc;

use tracing::{debug, info};

use super::lock_owned;
use crate::playlist::entity::{clamp_position, reorder_shift};
use crate::playlist::repository::PlaylistRepository;
use crate::shared::error::{PlatformError, Result};
use crate::track::repository::TrackRepository;
use crate::usecase::{ExecutionContext, PgUnitOfWork};

#[derive(Debug, Clone, Copy)]
pub struct AddTrackCommand {
    pub playlist_id: i64,
    pub track_id: i64,
}

pub struct AddTrackUseCase {
    uow: PgUnitOfWork,
    playlists: Arc<PlaylistRepository>,
    tracks: Arc<TrackRepository>,
}

impl AddTrackUseCase {
    pub fn new(uow: PgUnitOfWork, playlists: Arc<PlaylistRepository>, tracks: Arc<TrackRepository>) -> Self {
        Self { uow, playlists, tracks }
    }

    /// Appends the track. Returns false when it was already in the playlist.
    pub async fn execute(&self, ctx: &ExecutionContext, command: AddTrackCommand) -> Result<bool> {
        let caller = ctx.require_caller()?;
        let AddTrackCommand { playlist_id, track_id } = command;

        let mut tx = self.uow.begin().await?;
        lock_owned(&self.playlists, &mut *tx, playlist_id, caller.id).await?;
        self.tracks.find_by_id(Some(&mut *tx), track_id).await?;

        let position = self.playlists.max_position(Some(&mut *tx), playlist_id).await? + 1;
        let added = self
            .playlists
            .insert_track(Some(&mut *tx), playlist_id, track_id, position)
            .await?;
        tx.commit().await?;

        if added {
            info!(playlist_id, track_id, position, "Track added to playlist");
        } else {
            debug!(playlist_id, track_id, "Track already in playlist");
        }
        Ok(added)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RemoveTrackCommand {
    pub playlist_id: i64,
    pub track_id: i64,
}

pub struct RemoveTrackUseCase {
    uow: PgUnitOfWork,
    playlists: Arc<PlaylistRepository>,
}

impl RemoveTrackUseCase {
    pub fn new(uow: PgUnitOfWork, playlists: Arc<PlaylistRepository>) -> Self {
        Self { uow, playlists }
    }

    /// Returns false when the track was not in the playlist.
    pub async fn execute(&self, ctx: &ExecutionContext, command: RemoveTrackCommand) -> Result<bool> {
        let caller = ctx.require_caller()?;
        let RemoveTrackCommand { playlist_id, track_id } = command;

        let mut tx = self.uow.begin().await?;
        lock_owned(&self.playlists, &mut *tx, playlist_id, caller.id).await?;
        let removed = self.playlists.remove_track(Some(&mut *tx), playlist_id, track_id).await?;
        tx.commit().await?;

        if removed {
            info!(playlist_id, track_id, "Track removed from playlist");
        }
        Ok(removed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReorderTrackCommand {
    pub playlist_id: i64,
    pub track_id: i64,
    /// Requested 1-based position; clamped into `[1, N]`.
    pub position: i64,
}

pub struct ReorderTrackUseCase {
    uow: PgUnitOfWork,
    playlists: Arc<PlaylistRepository>,
}

impl ReorderTrackUseCase {
    pub fn new(uow: PgUnitOfWork, playlists: Arc<PlaylistRepository>) -> Self {
        Self { uow, playlists }
    }

    /// Returns the position the track ends up at. Positions are read after
    /// the row lock is held, so queued reorders see the order left by the
    /// one before them.
    pub async fn execute(&self, ctx: &ExecutionContext, command: ReorderTrackCommand) -> Result<i32> {
        let caller = ctx.require_caller()?;
        let ReorderTrackCommand {
            playlist_id,
            track_id,
            position,
        } = command;

        let mut tx = self.uow.begin().await?;
        lock_owned(&self.playlists, &mut *tx, playlist_id, caller.id).await?;

        let from = self
            .playlists
            .position_of(Some(&mut *tx), playlist_id, track_id)
            .await?
            .ok_or_else(|| PlatformError::not_found("playlist track", track_id))?;
        let len = self.playlists.track_count(Some(&mut *tx), playlist_id).await?;
        let to = clamp_position(position, len);

        if let Some(shift) = reorder_shift(from, to) {
            self.playlists
                .shift_positions(Some(&mut *tx), playlist_id, track_id, shift)
                .await?;
            self.playlists.set_position(Some(&mut *tx), playlist_id, track_id, to).await?;
        }
        tx.commit().await?;

        info!(playlist_id, track_id, from, to, "Track reordered");
        Ok(to)
    }
}
