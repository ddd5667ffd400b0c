//! Feed API
//!
//! The landing page: popular artists, tracks and playlists next to the
//! newest albums.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::album::api::AlbumResponse;
use crate::album::AlbumService;
use crate::artist::api::ArtistResponse;
use crate::artist::ArtistService;
use crate::playlist::api::PlaylistResponse;
use crate::playlist::operations::PlaylistQueries;
use crate::shared::error::PlatformError;
use crate::shared::middleware::OptionalAuth;
use crate::track::api::TrackResponse;
use crate::track::TrackService;

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedResponse {
    pub albums: Vec<AlbumResponse>,
    pub artists: Vec<ArtistResponse>,
    pub tracks: Vec<TrackResponse>,
    pub playlists: Vec<PlaylistResponse>,
}

#[derive(Clone)]
pub struct FeedState {
    pub albums: Arc<AlbumService>,
    pub artists: Arc<ArtistService>,
    pub tracks: Arc<TrackService>,
    pub playlists: Arc<PlaylistQueries>,
    /// Length of each list
    pub items_per_kind: u32,
}

/// Aggregate feed
#[utoipa::path(
    get,
    path = "",
    tag = "feed",
    responses((status = 200, description = "Feed", body = FeedResponse))
)]
pub async fn get_feed(
    State(state): State<FeedState>,
    OptionalAuth(ctx): OptionalAuth,
) -> Result<Json<FeedResponse>, PlatformError> {
    let limit = state.items_per_kind;
    let (albums, artists, tracks, playlists) = tokio::try_join!(
        state.albums.feed(&ctx, limit),
        state.artists.feed(&ctx, limit),
        state.tracks.feed(&ctx, limit),
        state.playlists.feed(&ctx, limit),
    )?;

    Ok(Json(FeedResponse {
        albums: albums.into_iter().map(Into::into).collect(),
        artists: artists.into_iter().map(Into::into).collect(),
        tracks: tracks.into_iter().map(Into::into).collect(),
        playlists: playlists.into_iter().map(Into::into).collect(),
    }))
}

pub fn feed_router(state: FeedState) -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(get_feed)).with_state(state)
}
