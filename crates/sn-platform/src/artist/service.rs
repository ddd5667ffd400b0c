//! Artist Service

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use super::entity::{Artist, ArtistDetails, ArtistRef, NewArtist};
use super::repository::ArtistRepository;
use crate::blob::BlobStore;
use crate::like::{LikeService, LikeTarget};
use crate::shared::error::{PlatformError, Result};
use crate::shared::file::{store_upload, UploadPolicy};
use crate::usecase::{ExecutionContext, PgUnitOfWork};

pub struct ArtistService {
    uow: PgUnitOfWork,
    artists: Arc<ArtistRepository>,
    likes: Arc<LikeService>,
    blobs: Arc<dyn BlobStore>,
    avatar_policy: UploadPolicy,
}

impl ArtistService {
    pub fn new(
        uow: PgUnitOfWork,
        artists: Arc<ArtistRepository>,
        likes: Arc<LikeService>,
        blobs: Arc<dyn BlobStore>,
        avatar_policy: UploadPolicy,
    ) -> Self {
        Self {
            uow,
            artists,
            likes,
            blobs,
            avatar_policy,
        }
    }

    /// The caller becomes the managing user of the new artist.
    pub async fn create(&self, ctx: &ExecutionContext, name: String, avatar: Option<Bytes>) -> Result<i64> {
        let caller = ctx.require_caller()?;

        let mut artist = NewArtist {
            name,
            user_id: caller.id,
            avatar_src: String::new(),
        };
        artist.validate()?;

        if let Some(data) = avatar {
            artist.avatar_src = store_upload(self.blobs.as_ref(), &self.avatar_policy, data).await?.path;
        }

        let id = self.artists.insert(None, &artist).await?;
        info!(artist_id = id, user_id = caller.id, "Artist created");
        Ok(id)
    }

    /// Only the managing user may delete. Albums credited solely to this
    /// artist must be deleted first.
    pub async fn delete(&self, ctx: &ExecutionContext, id: i64) -> Result<()> {
        let caller = ctx.require_caller()?;
        let mut tx = self.uow.begin().await?;

        let artist = self.artists.find_by_id(Some(&mut *tx), id).await?;
        if artist.user_id != Some(caller.id) {
            return Err(PlatformError::forbidden("only the managing user can delete this artist"));
        }
        if self.artists.sole_artist_album_count(Some(&mut *tx), id).await? > 0 {
            return Err(PlatformError::validation(
                "artist is the only artist of some albums; delete those albums first",
            ));
        }

        self.artists.delete(Some(&mut *tx), id).await?;
        tx.commit().await?;

        info!(artist_id = id, user_id = caller.id, "Artist deleted");
        Ok(())
    }

    pub async fn get(&self, ctx: &ExecutionContext, id: i64) -> Result<ArtistDetails> {
        let artist = self.artists.find_by_id(None, id).await?;
        let mut details = self.present(ctx, vec![artist]).await?;
        details
            .pop()
            .ok_or_else(|| PlatformError::internal("artist presentation lost its row"))
    }

    pub async fn list_by_album(&self, ctx: &ExecutionContext, album_id: i64) -> Result<Vec<ArtistDetails>> {
        let artists = self.artists.find_by_album(None, album_id).await?;
        self.present(ctx, artists).await
    }

    pub async fn list_by_track(&self, ctx: &ExecutionContext, track_id: i64) -> Result<Vec<ArtistDetails>> {
        let artists = self.artists.find_by_track(None, track_id).await?;
        self.present(ctx, artists).await
    }

    pub async fn liked_by_user(&self, ctx: &ExecutionContext, user_id: i64) -> Result<Vec<ArtistDetails>> {
        let artists = self.artists.find_liked_by_user(None, user_id).await?;
        self.present(ctx, artists).await
    }

    pub async fn feed(&self, ctx: &ExecutionContext, limit: u32) -> Result<Vec<ArtistDetails>> {
        let artists = self.artists.feed(None, i64::from(limit)).await?;
        self.present(ctx, artists).await
    }

    /// Mark each artist liked or not for the caller.
    pub async fn present(&self, ctx: &ExecutionContext, artists: Vec<Artist>) -> Result<Vec<ArtistDetails>> {
        let ids: Vec<i64> = artists.iter().map(|a| a.id).collect();
        let liked = self.likes.liked_set(ctx, LikeTarget::Artist, &ids).await?;

        Ok(artists
            .into_iter()
            .map(|artist| ArtistDetails {
                is_liked: liked.contains(&artist.id),
                artist,
            })
            .collect())
    }

    /// Artist references grouped by album.
    pub async fn refs_for_albums(&self, album_ids: &[i64]) -> Result<HashMap<i64, Vec<ArtistRef>>> {
        Ok(group(self.artists.refs_for_albums(None, album_ids).await?))
    }

    /// Artist references grouped by track.
    pub async fn refs_for_tracks(&self, track_ids: &[i64]) -> Result<HashMap<i64, Vec<ArtistRef>>> {
        Ok(group(self.artists.refs_for_tracks(None, track_ids).await?))
    }
}

fn group(pairs: Vec<(i64, ArtistRef)>) -> HashMap<i64, Vec<ArtistRef>> {
    let mut grouped: HashMap<i64, Vec<ArtistRef>> = HashMap::new();
    for (owner, artist) in pairs {
        grouped.entry(owner).or_default().push(artist);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_keeps_order_per_owner() {
        let pairs = vec![
            (1, ArtistRef { id: 10, name: "a".into() }),
            (2, ArtistRef { id: 11, name: "b".into() }),
            (1, ArtistRef { id: 12, name: "c".into() }),
        ];
        let grouped = group(pairs);
        assert_eq!(grouped[&1].iter().map(|a| a.id).collect::<Vec<_>>(), vec![10, 12]);
        assert_eq!(grouped[&2].len(), 1);
    }
}
