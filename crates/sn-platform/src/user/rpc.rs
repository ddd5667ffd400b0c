//! User RPC service

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Router;
use tracing::debug;

use crate::rpc::messages::{
    AvatarExtra, AvatarPathReply, Empty, PlaylistIdRequest, UpdateInfoRequest, UpdatePasswordRequest, UserIdRequest,
    UserMessage, UsersReply, VersionReply,
};
use crate::rpc::server::read_chunks;
use crate::rpc::{RpcRequest, RpcUpload, Unary, USER_SERVICE};
use crate::shared::error::PlatformError;
use crate::user::entity::UserUpdate;
use crate::user::service::UserService;

async fn get_user(
    State(users): State<Arc<UserService>>,
    RpcRequest(_, request): RpcRequest<UserIdRequest>,
) -> Unary<UserMessage> {
    Unary(users.get_user(request.user_id).await.map(UserMessage::from))
}

async fn update_info(
    State(users): State<Arc<UserService>>,
    RpcRequest(_, request): RpcRequest<UpdateInfoRequest>,
) -> Unary<Empty> {
    let result = async {
        users.update_info(UserUpdate::try_from(request)?).await?;
        Ok::<_, PlatformError>(Empty {})
    }
    .await;
    Unary(result)
}

async fn update_password(
    State(users): State<Arc<UserService>>,
    RpcRequest(_, request): RpcRequest<UpdatePasswordRequest>,
) -> Unary<VersionReply> {
    Unary(
        users
            .update_password(request.user_id, &request.old_password, &request.new_password)
            .await
            .map(|version| VersionReply { version }),
    )
}

async fn upload_avatar(State(users): State<Arc<UserService>>, upload: RpcUpload<AvatarExtra>) -> Unary<AvatarPathReply> {
    let RpcUpload { head, chunks, .. } = upload;
    let result = async {
        let data = read_chunks(chunks, users.avatar_limit()).await?;
        debug!(user_id = head.user_id, bytes = data.len(), "Avatar upload received");
        let path = users.upload_avatar(head.user_id, &head.extension, data).await?;
        Ok::<_, PlatformError>(AvatarPathReply { path })
    }
    .await;
    Unary(result)
}

async fn users_by_playlist(
    State(users): State<Arc<UserService>>,
    RpcRequest(_, request): RpcRequest<PlaylistIdRequest>,
) -> Unary<UsersReply> {
    Unary(
        users
            .users_by_playlist(request.playlist_id)
            .await
            .map(|owners| UsersReply {
                users: owners.into_iter().map(UserMessage::from).collect(),
            }),
    )
}

pub fn user_rpc_router(users: Arc<UserService>) -> Router {
    Router::new()
        .route(&format!("/{}/GetUserById", USER_SERVICE), post(get_user))
        .route(&format!("/{}/UpdateInfo", USER_SERVICE), post(update_info))
        .route(&format!("/{}/UpdatePassword", USER_SERVICE), post(update_password))
        .route(&format!("/{}/UploadAvatar", USER_SERVICE), post(upload_avatar))
        .route(&format!("/{}/GetUsersByPlaylist", USER_SERVICE), post(users_by_playlist))
        .with_state(users)
}
