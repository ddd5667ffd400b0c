//! Albums API
//!
//! - POST /api/albums - Create an album credited to artists the caller manages
//! - GET /api/albums/{id}
//! - GET /api/albums/{id}/tracks
//! - GET /api/albums/{id}/artists
//! - POST /api/albums/{id}/cover - Multipart field `cover`
//! - DELETE /api/albums/{id}

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::album::entity::{AlbumDetails, NewAlbum};
use crate::album::service::AlbumService;
use crate::artist::api::{ArtistRefResponse, ArtistResponse};
use crate::artist::ArtistService;
use crate::shared::api_common::{IdResponse, JsonBody, StatusResponse, UploadResponse};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{Authenticated, OptionalAuth};
use crate::shared::multipart::MultipartForm;
use crate::shared::validation::non_blank;
use crate::track::api::TrackResponse;
use crate::track::TrackService;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlbumRequest {
    pub name: String,
    pub description: Option<String>,
    /// Credited artist ids; at least one
    pub artists: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlbumResponse {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cover_src: String,
    pub artists: Vec<ArtistRefResponse>,
    pub is_liked: bool,
}

impl From<AlbumDetails> for AlbumResponse {
    fn from(d: AlbumDetails) -> Self {
        Self {
            id: d.album.id,
            name: d.album.name,
            description: d.album.description,
            cover_src: d.album.cover_src,
            artists: d.artists.into_iter().map(Into::into).collect(),
            is_liked: d.is_liked,
        }
    }
}

/// Multipart body of a cover upload.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CoverForm {
    #[schema(value_type = String, format = Binary)]
    pub cover: Vec<u8>,
}

#[derive(Clone)]
pub struct AlbumsState {
    pub albums: Arc<AlbumService>,
    pub artists: Arc<ArtistService>,
    pub tracks: Arc<TrackService>,
    pub max_upload_size: usize,
}

/// Create an album
#[utoipa::path(
    post,
    path = "",
    tag = "albums",
    request_body = CreateAlbumRequest,
    responses(
        (status = 200, description = "Album created", body = IdResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Caller does not manage every listed artist")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_album(
    State(state): State<AlbumsState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<CreateAlbumRequest>,
) -> Result<Json<IdResponse>, PlatformError> {
    let album = NewAlbum {
        name: req.name,
        description: non_blank(req.description),
        artist_ids: req.artists,
    };
    let id = state.albums.create(&auth.ctx, album).await?;
    Ok(Json(IdResponse { id }))
}

/// Get an album
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "albums",
    params(("id" = i64, Path, description = "Album id")),
    responses(
        (status = 200, description = "Album found", body = AlbumResponse),
        (status = 404, description = "Album not found")
    )
)]
pub async fn get_album(
    State(state): State<AlbumsState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<AlbumResponse>, PlatformError> {
    Ok(Json(state.albums.get(&ctx, id).await?.into()))
}

/// Delete an album
///
/// Tracks of the album are kept and lose their album reference.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "albums",
    params(("id" = i64, Path, description = "Album id")),
    responses(
        (status = 200, description = "Album deleted", body = StatusResponse),
        (status = 403, description = "Caller manages none of the album's artists"),
        (status = 404, description = "Album not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_album(
    State(state): State<AlbumsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, PlatformError> {
    state.albums.delete(&auth.ctx, id).await?;
    Ok(Json(StatusResponse::ok()))
}

/// Tracks of an album, in album order
#[utoipa::path(
    get,
    path = "/{id}/tracks",
    tag = "albums",
    params(("id" = i64, Path, description = "Album id")),
    responses((status = 200, description = "Tracks", body = Vec<TrackResponse>))
)]
pub async fn list_album_tracks(
    State(state): State<AlbumsState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TrackResponse>>, PlatformError> {
    let tracks = state.tracks.list_by_album(&ctx, id).await?;
    Ok(Json(tracks.into_iter().map(Into::into).collect()))
}

/// Artists credited on an album
#[utoipa::path(
    get,
    path = "/{id}/artists",
    tag = "albums",
    params(("id" = i64, Path, description = "Album id")),
    responses((status = 200, description = "Artists", body = Vec<ArtistResponse>))
)]
pub async fn list_album_artists(
    State(state): State<AlbumsState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ArtistResponse>>, PlatformError> {
    let artists = state.artists.list_by_album(&ctx, id).await?;
    Ok(Json(artists.into_iter().map(Into::into).collect()))
}

/// Upload an album cover
#[utoipa::path(
    post,
    path = "/{id}/cover",
    tag = "albums",
    params(("id" = i64, Path, description = "Album id")),
    request_body(content = CoverForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Cover stored", body = UploadResponse),
        (status = 403, description = "Caller manages none of the album's artists"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Not a png, jpeg or gif image")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_album_cover(
    State(state): State<AlbumsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, PlatformError> {
    let mut form = MultipartForm::read(multipart, state.max_upload_size).await?;
    let data = form.require_file("cover")?;

    let path = state.albums.upload_cover(&auth.ctx, id, data).await?;
    Ok(Json(UploadResponse::new(path)))
}

pub fn albums_router(state: AlbumsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_album))
        .routes(routes!(get_album, delete_album))
        .routes(routes!(list_album_tracks))
        .routes(routes!(list_album_artists))
        .routes(routes!(upload_album_cover))
        .with_state(state)
}
