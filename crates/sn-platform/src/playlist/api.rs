//! Playlists API
//!
//! Reads accept anonymous callers; every mutation requires an owner and
//! passes the anti-forgery check applied to the `/api` router.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::playlist::entity::PlaylistDetails;
use crate::playlist::operations::{
    AddPlaylistOwnerCommand, AddPlaylistOwnerUseCase, AddTrackCommand, AddTrackUseCase, CreatePlaylistCommand,
    CreatePlaylistUseCase, DeletePlaylistCommand, DeletePlaylistUseCase, PlaylistQueries, RemoveTrackCommand,
    RemoveTrackUseCase, ReorderTrackCommand, ReorderTrackUseCase, UpdatePlaylistCommand, UpdatePlaylistUseCase,
    UploadPlaylistCoverCommand, UploadPlaylistCoverUseCase,
};
use crate::shared::api_common::{ChangedResponse, IdResponse, JsonBody, StatusResponse, UploadResponse};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{Authenticated, OptionalAuth};
use crate::shared::multipart::MultipartForm;
use crate::shared::validation::non_blank;
use crate::track::api::TrackResponse;
use crate::track::TrackService;
use crate::user::api::UserResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: Option<String>,
    /// Users made co-owners next to the caller
    #[serde(default)]
    pub users: Vec<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePlaylistRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddTrackRequest {
    #[serde(rename = "trackID")]
    pub track_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderTrackRequest {
    #[serde(rename = "trackID")]
    pub track_id: i64,
    /// 1-based target position; clamped into the playlist
    pub position: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReorderTrackResponse {
    pub status: String,
    /// Position the track ended up at
    pub position: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddOwnerRequest {
    #[serde(rename = "userID")]
    pub user_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResponse {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cover_src: String,
    pub owners: Vec<UserResponse>,
    pub is_liked: bool,
}

impl From<PlaylistDetails> for PlaylistResponse {
    fn from(d: PlaylistDetails) -> Self {
        Self {
            id: d.playlist.id,
            name: d.playlist.name,
            description: d.playlist.description,
            cover_src: d.playlist.cover_src,
            owners: d.owners.into_iter().map(Into::into).collect(),
            is_liked: d.is_liked,
        }
    }
}

/// Multipart body of a cover upload.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct PlaylistCoverForm {
    #[schema(value_type = String, format = Binary)]
    pub cover: Vec<u8>,
}

#[derive(Clone)]
pub struct PlaylistsState {
    pub create_use_case: Arc<CreatePlaylistUseCase>,
    pub update_use_case: Arc<UpdatePlaylistUseCase>,
    pub cover_use_case: Arc<UploadPlaylistCoverUseCase>,
    pub add_track_use_case: Arc<AddTrackUseCase>,
    pub remove_track_use_case: Arc<RemoveTrackUseCase>,
    pub reorder_use_case: Arc<ReorderTrackUseCase>,
    pub add_owner_use_case: Arc<AddPlaylistOwnerUseCase>,
    pub delete_use_case: Arc<DeletePlaylistUseCase>,
    pub queries: Arc<PlaylistQueries>,
    pub tracks: Arc<TrackService>,
    pub max_upload_size: usize,
}

/// Create a playlist
#[utoipa::path(
    post,
    path = "",
    tag = "playlists",
    request_body = CreatePlaylistRequest,
    responses(
        (status = 200, description = "Playlist created", body = IdResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "A listed co-owner does not exist")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_playlist(
    State(state): State<PlaylistsState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<CreatePlaylistRequest>,
) -> Result<Json<IdResponse>, PlatformError> {
    let command = CreatePlaylistCommand {
        name: req.name,
        description: non_blank(req.description),
        co_owners: req.users,
    };
    let id = state.create_use_case.execute(&auth.ctx, command).await?;
    Ok(Json(IdResponse { id }))
}

/// Get a playlist
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "playlists",
    params(("id" = i64, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Playlist found", body = PlaylistResponse),
        (status = 404, description = "Playlist not found")
    )
)]
pub async fn get_playlist(
    State(state): State<PlaylistsState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<PlaylistResponse>, PlatformError> {
    Ok(Json(state.queries.get(&ctx, id).await?.into()))
}

async fn delete(state: &PlaylistsState, auth: &Authenticated, id: i64) -> Result<Json<StatusResponse>, PlatformError> {
    state
        .delete_use_case
        .execute(&auth.ctx, DeletePlaylistCommand { id })
        .await?;
    Ok(Json(StatusResponse::ok()))
}

/// Delete a playlist
///
/// Removes likes, owners and track memberships. The cover file stays.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "playlists",
    params(("id" = i64, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Playlist deleted", body = StatusResponse),
        (status = 403, description = "Not an owner"),
        (status = 404, description = "Playlist not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_playlist(
    State(state): State<PlaylistsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, PlatformError> {
    delete(&state, &auth, id).await
}

/// Delete a playlist (form-friendly alias of `DELETE /{id}`)
#[utoipa::path(
    post,
    path = "/{id}/delete",
    tag = "playlists",
    params(("id" = i64, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Playlist deleted", body = StatusResponse),
        (status = 403, description = "Not an owner"),
        (status = 404, description = "Playlist not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn post_delete_playlist(
    State(state): State<PlaylistsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, PlatformError> {
    delete(&state, &auth, id).await
}

/// Rename a playlist or change its description
#[utoipa::path(
    post,
    path = "/{id}/update",
    tag = "playlists",
    params(("id" = i64, Path, description = "Playlist id")),
    request_body = UpdatePlaylistRequest,
    responses(
        (status = 200, description = "Playlist updated", body = StatusResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not an owner"),
        (status = 404, description = "Playlist not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_playlist(
    State(state): State<PlaylistsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdatePlaylistRequest>,
) -> Result<Json<StatusResponse>, PlatformError> {
    let command = UpdatePlaylistCommand {
        id,
        name: req.name,
        description: non_blank(req.description),
    };
    state.update_use_case.execute(&auth.ctx, command).await?;
    Ok(Json(StatusResponse::ok()))
}

/// Upload a playlist cover
///
/// Identical images share one stored file.
#[utoipa::path(
    post,
    path = "/{id}/cover",
    tag = "playlists",
    params(("id" = i64, Path, description = "Playlist id")),
    request_body(content = PlaylistCoverForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Cover stored", body = UploadResponse),
        (status = 403, description = "Not an owner"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Not a png, jpeg or gif image")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_playlist_cover(
    State(state): State<PlaylistsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, PlatformError> {
    let mut form = MultipartForm::read(multipart, state.max_upload_size).await?;
    let data = form.require_file("cover")?;

    let path = state
        .cover_use_case
        .execute(&auth.ctx, UploadPlaylistCoverCommand { id, data })
        .await?;
    Ok(Json(UploadResponse::new(path)))
}

/// Tracks of a playlist, by position
#[utoipa::path(
    get,
    path = "/{id}/tracks",
    tag = "playlists",
    params(("id" = i64, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Tracks", body = Vec<TrackResponse>),
        (status = 404, description = "Playlist not found")
    )
)]
pub async fn list_playlist_tracks(
    State(state): State<PlaylistsState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TrackResponse>>, PlatformError> {
    let tracks = state.tracks.list_by_playlist(&ctx, id).await?;
    Ok(Json(tracks.into_iter().map(Into::into).collect()))
}

/// Append a track
///
/// Adding a track that is already in the playlist changes nothing.
#[utoipa::path(
    post,
    path = "/{id}/tracks",
    tag = "playlists",
    params(("id" = i64, Path, description = "Playlist id")),
    request_body = AddTrackRequest,
    responses(
        (status = 200, description = "Track added", body = ChangedResponse),
        (status = 403, description = "Not an owner"),
        (status = 404, description = "Playlist or track not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_playlist_track(
    State(state): State<PlaylistsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<AddTrackRequest>,
) -> Result<Json<ChangedResponse>, PlatformError> {
    let command = AddTrackCommand {
        playlist_id: id,
        track_id: req.track_id,
    };
    let changed = state.add_track_use_case.execute(&auth.ctx, command).await?;
    Ok(Json(ChangedResponse::new(changed)))
}

/// Remove a track
#[utoipa::path(
    delete,
    path = "/{id}/tracks/{track_id}",
    tag = "playlists",
    params(
        ("id" = i64, Path, description = "Playlist id"),
        ("track_id" = i64, Path, description = "Track id")
    ),
    responses(
        (status = 200, description = "Track removed", body = ChangedResponse),
        (status = 403, description = "Not an owner"),
        (status = 404, description = "Playlist not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_playlist_track(
    State(state): State<PlaylistsState>,
    auth: Authenticated,
    Path((id, track_id)): Path<(i64, i64)>,
) -> Result<Json<ChangedResponse>, PlatformError> {
    let command = RemoveTrackCommand {
        playlist_id: id,
        track_id,
    };
    let changed = state.remove_track_use_case.execute(&auth.ctx, command).await?;
    Ok(Json(ChangedResponse::new(changed)))
}

/// Move a track to another position
#[utoipa::path(
    post,
    path = "/{id}/reorder",
    tag = "playlists",
    params(("id" = i64, Path, description = "Playlist id")),
    request_body = ReorderTrackRequest,
    responses(
        (status = 200, description = "Track moved", body = ReorderTrackResponse),
        (status = 403, description = "Not an owner"),
        (status = 404, description = "Playlist not found or track not in it")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reorder_playlist_track(
    State(state): State<PlaylistsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<ReorderTrackRequest>,
) -> Result<Json<ReorderTrackResponse>, PlatformError> {
    let command = ReorderTrackCommand {
        playlist_id: id,
        track_id: req.track_id,
        position: req.position,
    };
    let position = state.reorder_use_case.execute(&auth.ctx, command).await?;
    Ok(Json(ReorderTrackResponse {
        status: "ok".to_string(),
        position,
    }))
}

/// Add a co-owner
#[utoipa::path(
    post,
    path = "/{id}/owners",
    tag = "playlists",
    params(("id" = i64, Path, description = "Playlist id")),
    request_body = AddOwnerRequest,
    responses(
        (status = 200, description = "Owner added", body = ChangedResponse),
        (status = 403, description = "Not an owner"),
        (status = 404, description = "Playlist or user not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_playlist_owner(
    State(state): State<PlaylistsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<AddOwnerRequest>,
) -> Result<Json<ChangedResponse>, PlatformError> {
    let command = AddPlaylistOwnerCommand {
        playlist_id: id,
        user_id: req.user_id,
    };
    let changed = state.add_owner_use_case.execute(&auth.ctx, command).await?;
    Ok(Json(ChangedResponse::new(changed)))
}

pub fn playlists_router(state: PlaylistsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_playlist))
        .routes(routes!(get_playlist, delete_playlist))
        .routes(routes!(post_delete_playlist))
        .routes(routes!(update_playlist))
        .routes(routes!(upload_playlist_cover))
        .routes(routes!(list_playlist_tracks, add_playlist_track))
        .routes(routes!(remove_playlist_track))
        .routes(routes!(reorder_playlist_track))
        .routes(routes!(add_playlist_owner))
        .with_state(state)
}
