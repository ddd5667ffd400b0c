//! Artists API
//!
//! - POST /api/artists - Create an artist managed by the caller
//! - GET /api/artists/{id}
//! - GET /api/artists/{id}/albums
//! - GET /api/artists/{id}/tracks
//! - DELETE /api/artists/{id}

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::album::api::AlbumResponse;
use crate::album::AlbumService;
use crate::artist::entity::{ArtistDetails, ArtistRef};
use crate::artist::service::ArtistService;
use crate::shared::api_common::{IdResponse, StatusResponse};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{Authenticated, OptionalAuth};
use crate::shared::multipart::MultipartForm;
use crate::track::api::TrackResponse;
use crate::track::TrackService;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtistResponse {
    pub id: i64,
    pub name: String,
    pub avatar_src: String,
    pub is_liked: bool,
}

impl From<ArtistDetails> for ArtistResponse {
    fn from(d: ArtistDetails) -> Self {
        Self {
            id: d.artist.id,
            name: d.artist.name,
            avatar_src: d.artist.avatar_src,
            is_liked: d.is_liked,
        }
    }
}

/// Artist summary embedded in albums and tracks.
#[derive(Debug, Serialize, ToSchema)]
pub struct ArtistRefResponse {
    pub id: i64,
    pub name: String,
}

impl From<ArtistRef> for ArtistRefResponse {
    fn from(r: ArtistRef) -> Self {
        Self { id: r.id, name: r.name }
    }
}

/// Multipart body of an artist creation.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CreateArtistForm {
    pub name: String,
    /// Optional avatar image
    #[schema(value_type = Option<String>, format = Binary)]
    pub avatar: Option<Vec<u8>>,
}

#[derive(Clone)]
pub struct ArtistsState {
    pub artists: Arc<ArtistService>,
    pub albums: Arc<AlbumService>,
    pub tracks: Arc<TrackService>,
    pub max_upload_size: usize,
}

/// Create an artist
#[utoipa::path(
    post,
    path = "",
    tag = "artists",
    request_body(content = CreateArtistForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Artist created", body = IdResponse),
        (status = 400, description = "Validation error"),
        (status = 413, description = "Avatar too large"),
        (status = 415, description = "Avatar is not an image")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_artist(
    State(state): State<ArtistsState>,
    auth: Authenticated,
    multipart: Multipart,
) -> Result<Json<IdResponse>, PlatformError> {
    let mut form = MultipartForm::read(multipart, state.max_upload_size).await?;
    let name = form.require_text("name")?.to_string();
    let avatar = form.take_file("avatar");

    let id = state.artists.create(&auth.ctx, name, avatar).await?;
    Ok(Json(IdResponse { id }))
}

/// Get an artist
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "artists",
    params(("id" = i64, Path, description = "Artist id")),
    responses(
        (status = 200, description = "Artist found", body = ArtistResponse),
        (status = 404, description = "Artist not found")
    )
)]
pub async fn get_artist(
    State(state): State<ArtistsState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<ArtistResponse>, PlatformError> {
    Ok(Json(state.artists.get(&ctx, id).await?.into()))
}

/// Delete an artist
///
/// Only the managing user may delete. Albums credited to this artist
/// alone must be deleted first.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "artists",
    params(("id" = i64, Path, description = "Artist id")),
    responses(
        (status = 200, description = "Artist deleted", body = StatusResponse),
        (status = 400, description = "Artist still has albums of its own"),
        (status = 403, description = "Not the managing user"),
        (status = 404, description = "Artist not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_artist(
    State(state): State<ArtistsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, PlatformError> {
    state.artists.delete(&auth.ctx, id).await?;
    Ok(Json(StatusResponse::ok()))
}

/// Albums of an artist
#[utoipa::path(
    get,
    path = "/{id}/albums",
    tag = "artists",
    params(("id" = i64, Path, description = "Artist id")),
    responses((status = 200, description = "Albums, newest first", body = Vec<AlbumResponse>))
)]
pub async fn list_artist_albums(
    State(state): State<ArtistsState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<Vec<AlbumResponse>>, PlatformError> {
    let albums = state.albums.list_by_artist(&ctx, id).await?;
    Ok(Json(albums.into_iter().map(Into::into).collect()))
}

/// Tracks of an artist
#[utoipa::path(
    get,
    path = "/{id}/tracks",
    tag = "artists",
    params(("id" = i64, Path, description = "Artist id")),
    responses((status = 200, description = "Tracks", body = Vec<TrackResponse>))
)]
pub async fn list_artist_tracks(
    State(state): State<ArtistsState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TrackResponse>>, PlatformError> {
    let tracks = state.tracks.list_by_artist(&ctx, id).await?;
    Ok(Json(tracks.into_iter().map(Into::into).collect()))
}

pub fn artists_router(state: ArtistsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_artist))
        .routes(routes!(get_artist, delete_artist))
        .routes(routes!(list_artist_albums))
        .routes(routes!(list_artist_tracks))
        .with_state(state)
}
