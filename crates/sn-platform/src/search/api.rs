//! Search API

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::service::SearchService;
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

const DEFAULT_AMOUNT: u32 = 10;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Free text matched against names
    pub query: String,
    /// Results per kind, at most 50
    pub amount: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub albums: Vec<AlbumResponse>,
    pub artists: Vec<ArtistResponse>,
    pub tracks: Vec<TrackResponse>,
    pub playlists: Vec<PlaylistResponse>,
}

#[derive(Clone)]
pub struct SearchState {
    pub search: Arc<SearchService>,
    pub albums: Arc<AlbumService>,
    pub artists: Arc<ArtistService>,
    pub tracks: Arc<TrackService>,
    pub playlists: Arc<PlaylistQueries>,
}

/// Search the catalog
///
/// Each list is ordered by relevance.
#[utoipa::path(
    get,
    path = "",
    tag = "search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matches per kind", body = SearchResponse),
        (status = 500, description = "Search service failed")
    )
)]
pub async fn search(
    State(state): State<SearchState>,
    OptionalAuth(ctx): OptionalAuth,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, PlatformError> {
    let found = state
        .search
        .search(&ctx, &params.query, params.amount.unwrap_or(DEFAULT_AMOUNT))
        .await?;

    let (albums, artists, tracks, playlists) = tokio::try_join!(
        state.albums.present(&ctx, found.albums),
        state.artists.present(&ctx, found.artists),
        state.tracks.present(&ctx, found.tracks),
        state.playlists.compose(&ctx, found.playlists),
    )?;

    Ok(Json(SearchResponse {
        albums: albums.into_iter().map(Into::into).collect(),
        artists: artists.into_iter().map(Into::into).collect(),
        tracks: tracks.into_iter().map(Into::into).collect(),
        playlists: playlists.into_iter().map(Into::into).collect(),
    }))
}

pub fn search_router(state: SearchState) -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(search)).with_state(state)
}
