//! Album Service

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use super::entity::{Album, AlbumDetails, NewAlbum};
use super::repository::AlbumRepository;
use crate::artist::repository::ArtistRepository;
use crate::artist::ArtistService;
use crate::blob::BlobStore;
use crate::like::{LikeService, LikeTarget};
use crate::shared::error::{PlatformError, Result};
use crate::shared::file::{store_upload, UploadPolicy};
use crate::usecase::{ExecutionContext, PgUnitOfWork};

pub struct AlbumService {
    uow: PgUnitOfWork,
    albums: Arc<AlbumRepository>,
    artists: Arc<ArtistRepository>,
    artist_service: Arc<ArtistService>,
    likes: Arc<LikeService>,
    blobs: Arc<dyn BlobStore>,
    cover_policy: UploadPolicy,
}

impl AlbumService {
    pub fn new(
        uow: PgUnitOfWork,
        albums: Arc<AlbumRepository>,
        artists: Arc<ArtistRepository>,
        artist_service: Arc<ArtistService>,
        likes: Arc<LikeService>,
        blobs: Arc<dyn BlobStore>,
        cover_policy: UploadPolicy,
    ) -> Self {
        Self {
            uow,
            albums,
            artists,
            artist_service,
            likes,
            blobs,
            cover_policy,
        }
    }

    /// The caller must manage every credited artist.
    pub async fn create(&self, ctx: &ExecutionContext, mut album: NewAlbum) -> Result<i64> {
        let caller = ctx.require_caller()?;
        album.artist_ids = album.artist_ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        album.validate()?;

        let mut tx = self.uow.begin().await?;
        let owned = self.artists.owned_by(Some(&mut *tx), caller.id, &album.artist_ids).await?;
        if owned.len() != album.artist_ids.len() {
            return Err(PlatformError::forbidden("you do not manage every listed artist"));
        }

        let id = self.albums.insert(Some(&mut *tx), &album).await?;
        tx.commit().await?;

        info!(album_id = id, user_id = caller.id, "Album created");
        Ok(id)
    }

    async fn require_owner(&self, ctx: &ExecutionContext, id: i64) -> Result<i64> {
        let caller = ctx.require_caller()?;
        self.albums.find_by_id(None, id).await?;
        let owners = self.albums.owner_user_ids(None, id).await?;
        if !owners.contains(&caller.id) {
            return Err(PlatformError::forbidden("you do not manage an artist of this album"));
        }
        Ok(caller.id)
    }

    /// Returns the stored cover path.
    pub async fn upload_cover(&self, ctx: &ExecutionContext, id: i64, data: Bytes) -> Result<String> {
        self.require_owner(ctx, id).await?;

        let stored = store_upload(self.blobs.as_ref(), &self.cover_policy, data).await?;
        self.albums.update_cover(None, id, &stored.path).await?;

        info!(album_id = id, path = %stored.path, created = stored.created, "Album cover updated");
        Ok(stored.path)
    }

    pub async fn delete(&self, ctx: &ExecutionContext, id: i64) -> Result<()> {
        let user_id = self.require_owner(ctx, id).await?;

        let mut tx = self.uow.begin().await?;
        self.albums.delete(Some(&mut *tx), id).await?;
        tx.commit().await?;

        info!(album_id = id, user_id, "Album deleted");
        Ok(())
    }

    pub async fn get(&self, ctx: &ExecutionContext, id: i64) -> Result<AlbumDetails> {
        let album = self.albums.find_by_id(None, id).await?;
        let mut details = self.present(ctx, vec![album]).await?;
        details
            .pop()
            .ok_or_else(|| PlatformError::internal("album presentation lost its row"))
    }

    pub async fn list_by_artist(&self, ctx: &ExecutionContext, artist_id: i64) -> Result<Vec<AlbumDetails>> {
        self.artists.find_by_id(None, artist_id).await?;
        let albums = self.albums.find_by_artist(None, artist_id).await?;
        self.present(ctx, albums).await
    }

    pub async fn liked_by_user(&self, ctx: &ExecutionContext, user_id: i64) -> Result<Vec<AlbumDetails>> {
        let albums = self.albums.find_liked_by_user(None, user_id).await?;
        self.present(ctx, albums).await
    }

    pub async fn feed(&self, ctx: &ExecutionContext, limit: u32) -> Result<Vec<AlbumDetails>> {
        let albums = self.albums.feed(None, i64::from(limit)).await?;
        self.present(ctx, albums).await
    }

    /// Attach artist references and the caller's like flag.
    pub async fn present(&self, ctx: &ExecutionContext, albums: Vec<Album>) -> Result<Vec<AlbumDetails>> {
        let ids: Vec<i64> = albums.iter().map(|a| a.id).collect();
        let mut artists = self.artist_service.refs_for_albums(&ids).await?;
        let liked = self.likes.liked_set(ctx, LikeTarget::Album, &ids).await?;

        Ok(albums
            .into_iter()
            .map(|album| AlbumDetails {
                artists: artists.remove(&album.id).unwrap_or_default(),
                is_liked: liked.contains(&album.id),
                album,
            })
            .collect())
    }
}
