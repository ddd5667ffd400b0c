//! Tracks API
//!
//! - POST /api/tracks - Multipart: `record` file plus `name`, `albumId`,
//!   `albumPosition`, `artists` (comma separated ids) and `duration`
//! - GET /api/tracks/{id}
//! - GET /api/tracks/{id}/artists
//! - DELETE /api/tracks/{id}

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::artist::api::{ArtistRefResponse, ArtistResponse};
use crate::artist::ArtistService;
use crate::shared::api_common::{IdResponse, StatusResponse};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{Authenticated, OptionalAuth};
use crate::shared::multipart::MultipartForm;
use crate::track::entity::{NewTrack, TrackDetails};
use crate::track::service::TrackService;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_position: Option<i32>,
    pub cover_src: String,
    pub record_src: String,
    /// Seconds
    pub duration: i32,
    pub listens: i64,
    pub artists: Vec<ArtistRefResponse>,
    pub is_liked: bool,
}

impl From<TrackDetails> for TrackResponse {
    fn from(d: TrackDetails) -> Self {
        Self {
            id: d.track.id,
            name: d.track.name,
            album_id: d.track.album_id,
            album_position: d.track.album_position,
            cover_src: d.track.cover_src,
            record_src: d.track.record_src,
            duration: d.track.duration,
            listens: d.track.listens,
            artists: d.artists.into_iter().map(Into::into).collect(),
            is_liked: d.is_liked,
        }
    }
}

/// Multipart body of a track creation.
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct CreateTrackForm {
    pub name: String,
    pub album_id: Option<i64>,
    pub album_position: Option<i32>,
    /// Comma separated artist ids, e.g. `1,2`
    pub artists: String,
    /// Seconds
    pub duration: i32,
    /// mp3, wav, flac or ogg audio
    #[schema(value_type = String, format = Binary)]
    pub record: Vec<u8>,
}

#[derive(Clone)]
pub struct TracksState {
    pub tracks: Arc<TrackService>,
    pub artists: Arc<ArtistService>,
    pub max_record_size: usize,
}

fn new_track(form: &MultipartForm) -> Result<NewTrack, PlatformError> {
    Ok(NewTrack {
        name: form.require_text("name")?.to_string(),
        album_id: form.parse("albumId")?,
        album_position: form.parse("albumPosition")?,
        artist_ids: form.id_list("artists")?,
        duration: form
            .parse("duration")?
            .ok_or_else(|| PlatformError::validation("field duration is required"))?,
    })
}

/// Create a track
#[utoipa::path(
    post,
    path = "",
    tag = "tracks",
    request_body(content = CreateTrackForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Track created", body = IdResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Caller does not manage every listed artist"),
        (status = 413, description = "Record too large"),
        (status = 415, description = "Record is not a supported audio format")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_track(
    State(state): State<TracksState>,
    auth: Authenticated,
    multipart: Multipart,
) -> Result<Json<IdResponse>, PlatformError> {
    let mut form = MultipartForm::read(multipart, state.max_record_size).await?;
    let track = new_track(&form)?;
    let record = form.require_file("record")?;

    let id = state.tracks.create(&auth.ctx, track, record).await?;
    Ok(Json(IdResponse { id }))
}

/// Get a track
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "tracks",
    params(("id" = i64, Path, description = "Track id")),
    responses(
        (status = 200, description = "Track found", body = TrackResponse),
        (status = 404, description = "Track not found")
    )
)]
pub async fn get_track(
    State(state): State<TracksState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<TrackResponse>, PlatformError> {
    Ok(Json(state.tracks.get(&ctx, id).await?.into()))
}

/// Delete a track
///
/// Also removes it from every playlist, closing the position gaps.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "tracks",
    params(("id" = i64, Path, description = "Track id")),
    responses(
        (status = 200, description = "Track deleted", body = StatusResponse),
        (status = 403, description = "Caller manages none of the track's artists"),
        (status = 404, description = "Track not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_track(
    State(state): State<TracksState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, PlatformError> {
    state.tracks.delete(&auth.ctx, id).await?;
    Ok(Json(StatusResponse::ok()))
}

/// Artists credited on a track
#[utoipa::path(
    get,
    path = "/{id}/artists",
    tag = "tracks",
    params(("id" = i64, Path, description = "Track id")),
    responses((status = 200, description = "Artists", body = Vec<ArtistResponse>))
)]
pub async fn list_track_artists(
    State(state): State<TracksState>,
    OptionalAuth(ctx): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ArtistResponse>>, PlatformError> {
    let artists = state.artists.list_by_track(&ctx, id).await?;
    Ok(Json(artists.into_iter().map(Into::into).collect()))
}

pub fn tracks_router(state: TracksState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_track))
        .routes(routes!(get_track, delete_track))
        .routes(routes!(list_track_artists))
        .with_state(state)
}
