//! Track Service

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use super::entity::{NewTrack, Track, TrackDetails};
use super::repository::TrackRepository;
use crate::album::repository::AlbumRepository;
use crate::artist::repository::ArtistRepository;
use crate::artist::ArtistService;
use crate::blob::BlobStore;
use crate::like::{LikeService, LikeTarget};
use crate::playlist::repository::PlaylistRepository;
use crate::shared::error::{PlatformError, Result};
use crate::shared::file::{store_upload, UploadPolicy};
use crate::usecase::{ExecutionContext, PgUnitOfWork};

pub struct TrackService {
    uow: PgUnitOfWork,
    tracks: Arc<TrackRepository>,
    albums: Arc<AlbumRepository>,
    artists: Arc<ArtistRepository>,
    playlists: Arc<PlaylistRepository>,
    artist_service: Arc<ArtistService>,
    likes: Arc<LikeService>,
    blobs: Arc<dyn BlobStore>,
    record_policy: UploadPolicy,
    default_cover: String,
}

impl TrackService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        uow: PgUnitOfWork,
        tracks: Arc<TrackRepository>,
        albums: Arc<AlbumRepository>,
        artists: Arc<ArtistRepository>,
        playlists: Arc<PlaylistRepository>,
        artist_service: Arc<ArtistService>,
        likes: Arc<LikeService>,
        blobs: Arc<dyn BlobStore>,
        record_policy: UploadPolicy,
        default_cover: String,
    ) -> Self {
        Self {
            uow,
            tracks,
            albums,
            artists,
            playlists,
            artist_service,
            likes,
            blobs,
            record_policy,
            default_cover,
        }
    }

    /// Store the audio, then insert the track with its artist links. The
    /// cover is inherited from the album.
    pub async fn create(&self, ctx: &ExecutionContext, mut track: NewTrack, record: Bytes) -> Result<i64> {
        let caller = ctx.require_caller()?;
        track.artist_ids = track.artist_ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        track.validate()?;

        let owned = self.artists.owned_by(None, caller.id, &track.artist_ids).await?;
        if owned.len() != track.artist_ids.len() {
            return Err(PlatformError::forbidden("you do not manage every listed artist"));
        }

        let cover_src = match track.album_id {
            Some(album_id) => self.albums.find_by_id(None, album_id).await?.cover_src,
            None => self.default_cover.clone(),
        };

        let record = store_upload(self.blobs.as_ref(), &self.record_policy, record).await?;

        let mut tx = self.uow.begin().await?;
        let id = self
            .tracks
            .insert(Some(&mut *tx), &track, &cover_src, &record.path)
            .await?;
        tx.commit().await?;

        info!(track_id = id, user_id = caller.id, record = %record.path, "Track created");
        Ok(id)
    }

    /// Remove the track everywhere, renumbering each playlist it was in.
    pub async fn delete(&self, ctx: &ExecutionContext, id: i64) -> Result<()> {
        let caller = ctx.require_caller()?;
        let mut tx = self.uow.begin().await?;

        self.tracks.find_by_id(Some(&mut *tx), id).await?;
        let owners = self.tracks.owner_user_ids(Some(&mut *tx), id).await?;
        if !owners.contains(&caller.id) {
            return Err(PlatformError::forbidden("you do not manage an artist of this track"));
        }

        let playlists = self.playlists.lock_containing_track(Some(&mut *tx), id).await?;
        for playlist_id in &playlists {
            self.playlists.remove_track(Some(&mut *tx), *playlist_id, id).await?;
        }
        self.tracks.delete(Some(&mut *tx), id).await?;
        tx.commit().await?;

        info!(track_id = id, user_id = caller.id, playlists = playlists.len(), "Track deleted");
        Ok(())
    }

    pub async fn get(&self, ctx: &ExecutionContext, id: i64) -> Result<TrackDetails> {
        let track = self.tracks.find_by_id(None, id).await?;
        let mut details = self.present(ctx, vec![track]).await?;
        details
            .pop()
            .ok_or_else(|| PlatformError::internal("track presentation lost its row"))
    }

    pub async fn list_by_album(&self, ctx: &ExecutionContext, album_id: i64) -> Result<Vec<TrackDetails>> {
        self.albums.find_by_id(None, album_id).await?;
        let tracks = self.tracks.find_by_album(None, album_id).await?;
        self.present(ctx, tracks).await
    }

    pub async fn list_by_artist(&self, ctx: &ExecutionContext, artist_id: i64) -> Result<Vec<TrackDetails>> {
        self.artists.find_by_id(None, artist_id).await?;
        let tracks = self.tracks.find_by_artist(None, artist_id).await?;
        self.present(ctx, tracks).await
    }

    /// In playlist order.
    pub async fn list_by_playlist(&self, ctx: &ExecutionContext, playlist_id: i64) -> Result<Vec<TrackDetails>> {
        self.playlists.find_by_id(None, playlist_id).await?;
        let tracks = self.tracks.find_by_playlist(None, playlist_id).await?;
        self.present(ctx, tracks).await
    }

    pub async fn liked_by_user(&self, ctx: &ExecutionContext, user_id: i64) -> Result<Vec<TrackDetails>> {
        let tracks = self.tracks.find_liked_by_user(None, user_id).await?;
        self.present(ctx, tracks).await
    }

    pub async fn feed(&self, ctx: &ExecutionContext, limit: u32) -> Result<Vec<TrackDetails>> {
        let tracks = self.tracks.feed(None, i64::from(limit)).await?;
        self.present(ctx, tracks).await
    }

    pub async fn present(&self, ctx: &ExecutionContext, tracks: Vec<Track>) -> Result<Vec<TrackDetails>> {
        let ids: Vec<i64> = tracks.iter().map(|t| t.id).collect();
        let mut artists = self.artist_service.refs_for_tracks(&ids).await?;
        let liked = self.likes.liked_set(ctx, LikeTarget::Track, &ids).await?;

        Ok(tracks
            .into_iter()
            .map(|track| TrackDetails {
                artists: artists.remove(&track.id).unwrap_or_default(),
                is_liked: liked.contains(&track.id),
                track,
            })
            .collect())
    }
}
