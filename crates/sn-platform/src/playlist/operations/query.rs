//! Playlist read paths. Owners are resolved through the user service, one
//! call per playlist, issued concurrently.

use std::sync::Arc;

use futures::future::try_join_all;

use crate::like::{LikeService, LikeTarget};
use crate::playlist::entity::{Playlist, PlaylistDetails};
use crate::playlist::repository::PlaylistRepository;
use crate::shared::error::{PlatformError, Result};
use crate::usecase::ExecutionContext;
use crate::user::agent::UserAgent;

pub struct PlaylistQueries {
    playlists: Arc<PlaylistRepository>,
    likes: Arc<LikeService>,
    users: Arc<dyn UserAgent>,
}

impl PlaylistQueries {
    pub fn new(playlists: Arc<PlaylistRepository>, likes: Arc<LikeService>, users: Arc<dyn UserAgent>) -> Self {
        Self { playlists, likes, users }
    }

    pub async fn get(&self, ctx: &ExecutionContext, id: i64) -> Result<PlaylistDetails> {
        let playlist = self.playlists.find_by_id(None, id).await?;
        let mut details = self.compose(ctx, vec![playlist]).await?;
        details
            .pop()
            .ok_or_else(|| PlatformError::internal("playlist composition lost its row"))
    }

    pub async fn feed(&self, ctx: &ExecutionContext, limit: u32) -> Result<Vec<PlaylistDetails>> {
        let playlists = self.playlists.feed(None, i64::from(limit)).await?;
        self.compose(ctx, playlists).await
    }

    pub async fn liked_by_user(&self, ctx: &ExecutionContext, user_id: i64) -> Result<Vec<PlaylistDetails>> {
        let playlists = self.playlists.find_liked_by_user(None, user_id).await?;
        self.compose(ctx, playlists).await
    }

    pub async fn by_user(&self, ctx: &ExecutionContext, user_id: i64) -> Result<Vec<PlaylistDetails>> {
        let playlists = self.playlists.find_by_user(None, user_id).await?;
        self.compose(ctx, playlists).await
    }

    /// Attach owners and the caller's like flag.
    pub async fn compose(&self, ctx: &ExecutionContext, playlists: Vec<Playlist>) -> Result<Vec<PlaylistDetails>> {
        let ids: Vec<i64> = playlists.iter().map(|p| p.id).collect();
        let owners = try_join_all(ids.iter().map(|id| self.users.users_by_playlist(ctx, *id))).await?;
        let liked = self.likes.liked_set(ctx, LikeTarget::Playlist, &ids).await?;

        Ok(playlists
            .into_iter()
            .zip(owners)
            .map(|(playlist, owners)| PlaylistDetails {
                is_liked: liked.contains(&playlist.id),
                owners,
                playlist,
            })
            .collect())
    }
}
