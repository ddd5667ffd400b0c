//! Authorization RPC service

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Router;

use crate::auth::account_service::AccountService;
use crate::rpc::messages::{LoginRequest, SignUpRequest, UserIdRequest, UserMessage, VersionReply};
use crate::rpc::{RpcRequest, Unary, AUTHORIZATION_SERVICE};
use crate::shared::error::PlatformError;
use crate::user::entity::NewUser;

async fn sign_up(
    State(accounts): State<Arc<AccountService>>,
    RpcRequest(_, request): RpcRequest<SignUpRequest>,
) -> Unary<UserIdRequest> {
    let result = async {
        let user = NewUser::try_from(request)?;
        let user_id = accounts.sign_up(user).await?;
        Ok::<_, PlatformError>(UserIdRequest { user_id })
    }
    .await;
    Unary(result)
}

async fn login(
    State(accounts): State<Arc<AccountService>>,
    RpcRequest(_, request): RpcRequest<LoginRequest>,
) -> Unary<UserMessage> {
    Unary(
        accounts
            .login(&request.username, &request.password)
            .await
            .map(UserMessage::from),
    )
}

async fn logout(
    State(accounts): State<Arc<AccountService>>,
    RpcRequest(_, request): RpcRequest<UserIdRequest>,
) -> Unary<VersionReply> {
    Unary(accounts.logout(request.user_id).await.map(|version| VersionReply { version }))
}

async fn get_user(
    State(accounts): State<Arc<AccountService>>,
    RpcRequest(_, request): RpcRequest<UserIdRequest>,
) -> Unary<UserMessage> {
    Unary(accounts.get_user(request.user_id).await.map(UserMessage::from))
}

pub fn authorization_rpc_router(accounts: Arc<AccountService>) -> Router {
    Router::new()
        .route(&format!("/{}/SignUp", AUTHORIZATION_SERVICE), post(sign_up))
        .route(&format!("/{}/Login", AUTHORIZATION_SERVICE), post(login))
        .route(&format!("/{}/Logout", AUTHORIZATION_SERVICE), post(logout))
        .route(&format!("/{}/GetUserById", AUTHORIZATION_SERVICE), post(get_user))
        .with_state(accounts)
}
