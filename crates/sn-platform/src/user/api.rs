//! Users API
//!
//! - GET /api/users/{id} - Profile
//! - POST /api/users/{id}/update - Edit own profile
//! - POST /api/users/{id}/password - Change own password
//! - POST /api/users/{id}/avatar - Multipart field `avatar`
//! - GET /api/users/{id}/{tracks,albums,artists,playlists} - Liked items
//! - GET /api/users/{id}/owned-playlists

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::album::api::AlbumResponse;
use crate::album::AlbumService;
use crate::artist::api::ArtistResponse;
use crate::artist::ArtistService;
use crate::playlist::api::PlaylistResponse;
use crate::playlist::operations::PlaylistQueries;
use crate::shared::api_common::{JsonBody, StatusResponse, UploadResponse};
use crate::shared::error::PlatformError;
use crate::shared::file::MediaType;
use crate::shared::middleware::{Authenticated, OptionalAuth};
use crate::shared::multipart::MultipartForm;
use crate::track::api::TrackResponse;
use crate::track::TrackService;
use crate::user::agent::UserAgent;
use crate::user::entity::{Sex, User, UserUpdate};

/// Public profile. Password material and the session version are never
/// exposed.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    #[schema(value_type = String, format = Date)]
    pub birth_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_src: Option<String>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            sex: u.sex,
            birth_date: u.birth_date,
            avatar_src: u.avatar_src,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    #[schema(value_type = String, format = Date)]
    pub birth_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Multipart body of an avatar upload.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AvatarForm {
    #[schema(value_type = String, format = Binary)]
    pub avatar: Vec<u8>,
}

#[derive(Clone)]
pub struct UsersState {
    pub users: Arc<dyn UserAgent>,
    pub tracks: Arc<TrackService>,
    pub albums: Arc<AlbumService>,
    pub artists: Arc<ArtistService>,
    pub playlists: Arc<PlaylistQueries>,
    pub max_upload_size: usize,
}

fn require_self(auth: &Authenticated, id: i64) -> Result<(), PlatformError> {
    if auth.user.id != id {
        return Err(PlatformError::forbidden("you can only change your own profile"));
    }
    Ok(())
}

/// Get a user profile
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<UsersState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, PlatformError> {
    let user = state.users.get_user(&ctx, id).await?;
    Ok(Json(user.into()))
}

/// Edit own profile
#[utoipa::path(
    post,
    path = "/{id}/update",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = StatusResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not your profile"),
        (status = 409, description = "Username or email taken")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<Json<StatusResponse>, PlatformError> {
    require_self(&auth, id)?;

    let update = UserUpdate {
        id,
        username: req.username,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        sex: req.sex,
        birth_date: req.birth_date,
    };
    state.users.update_info(&auth.ctx, update).await?;
    Ok(Json(StatusResponse::ok()))
}

/// Change own password
///
/// Every existing session, including the current one, stops working.
#[utoipa::path(
    post,
    path = "/{id}/password",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = StatusResponse),
        (status = 400, description = "New password violates the policy"),
        (status = 403, description = "Not your profile, or the old password is wrong")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> Result<Json<StatusResponse>, PlatformError> {
    require_self(&auth, id)?;
    state
        .users
        .update_password(&auth.ctx, id, &req.old_password, &req.new_password)
        .await?;
    Ok(Json(StatusResponse::ok()))
}

/// Upload own avatar
#[utoipa::path(
    post,
    path = "/{id}/avatar",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body(content = AvatarForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar stored", body = UploadResponse),
        (status = 403, description = "Not your profile"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Not a png, jpeg, gif or webp image")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_avatar(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, PlatformError> {
    require_self(&auth, id)?;

    let mut form = MultipartForm::read(multipart, state.max_upload_size).await?;
    let data = form.require_file("avatar")?;
    let extension = MediaType::sniff(&data).map(MediaType::extension).unwrap_or("bin");

    let path = state.users.upload_avatar(&auth.ctx, id, extension, data).await?;
    Ok(Json(UploadResponse::new(path)))
}

/// Tracks liked by a user
#[utoipa::path(
    get,
    path = "/{id}/tracks",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Liked tracks", body = Vec<TrackResponse>)),
    security(("bearer_auth" = []))
)]
pub async fn liked_tracks(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TrackResponse>>, PlatformError> {
    let tracks = state.tracks.liked_by_user(&auth.ctx, id).await?;
    Ok(Json(tracks.into_iter().map(Into::into).collect()))
}

/// Albums liked by a user
#[utoipa::path(
    get,
    path = "/{id}/albums",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Liked albums", body = Vec<AlbumResponse>)),
    security(("bearer_auth" = []))
)]
pub async fn liked_albums(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<Vec<AlbumResponse>>, PlatformError> {
    let albums = state.albums.liked_by_user(&auth.ctx, id).await?;
    Ok(Json(albums.into_iter().map(Into::into).collect()))
}

/// Artists liked by a user
#[utoipa::path(
    get,
    path = "/{id}/artists",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Liked artists", body = Vec<ArtistResponse>)),
    security(("bearer_auth" = []))
)]
pub async fn liked_artists(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ArtistResponse>>, PlatformError> {
    let artists = state.artists.liked_by_user(&auth.ctx, id).await?;
    Ok(Json(artists.into_iter().map(Into::into).collect()))
}

/// Playlists liked by a user
#[utoipa::path(
    get,
    path = "/{id}/playlists",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Liked playlists", body = Vec<PlaylistResponse>)),
    security(("bearer_auth" = []))
)]
pub async fn liked_playlists(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PlaylistResponse>>, PlatformError> {
    let playlists = state.playlists.liked_by_user(&auth.ctx, id).await?;
    Ok(Json(playlists.into_iter().map(Into::into).collect()))
}

/// Playlists a user owns
#[utoipa::path(
    get,
    path = "/{id}/owned-playlists",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Owned playlists", body = Vec<PlaylistResponse>))
)]
pub async fn owned_playlists(
    State(state): State<UsersState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PlaylistResponse>>, PlatformError> {
    let playlists = state.playlists.by_user(&ctx, id).await?;
    Ok(Json(playlists.into_iter().map(Into::into).collect()))
}

pub fn users_router(state: UsersState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_user))
        .routes(routes!(update_profile))
        .routes(routes!(change_password))
        .routes(routes!(upload_avatar))
        .routes(routes!(liked_tracks))
        .routes(routes!(liked_albums))
        .routes(routes!(liked_artists))
        .routes(routes!(liked_playlists))
        .routes(routes!(owned_playlists))
        .with_state(state)
}
