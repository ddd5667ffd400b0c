//! Likes API
//!
//! `POST` and `DELETE` on `/{id}/like`, merged into the tracks, albums,
//! artists and playlists routers. Both are idempotent and report whether
//! anything changed.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::like::repository::LikeTarget;
use crate::like::service::LikeService;
use crate::shared::api_common::ChangedResponse;
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;

#[derive(Clone)]
pub struct LikesState {
    pub likes: Arc<LikeService>,
    /// Kind served by this router instance
    pub target: LikeTarget,
}

/// Like an item
#[utoipa::path(
    post,
    path = "/{id}/like",
    tag = "likes",
    params(("id" = i64, Path, description = "Id of the liked item")),
    responses(
        (status = 200, description = "Liked; `changed` is false when it already was", body = ChangedResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such item")
    ),
    security(("bearer_auth" = []))
)]
pub async fn like(
    State(state): State<LikesState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<ChangedResponse>, PlatformError> {
    let changed = state.likes.like(&auth.ctx, state.target, id).await?;
    Ok(Json(ChangedResponse::new(changed)))
}

/// Remove a like
#[utoipa::path(
    delete,
    path = "/{id}/like",
    tag = "likes",
    params(("id" = i64, Path, description = "Id of the liked item")),
    responses(
        (status = 200, description = "Unliked; `changed` is false when it was not liked", body = ChangedResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn unlike(
    State(state): State<LikesState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<ChangedResponse>, PlatformError> {
    let changed = state.likes.unlike(&auth.ctx, state.target, id).await?;
    Ok(Json(ChangedResponse::new(changed)))
}

pub fn likes_router(likes: Arc<LikeService>, target: LikeTarget) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(like, unlike))
        .with_state(LikesState { likes, target })
}
