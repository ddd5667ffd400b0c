//! Authorization service agent

use async_trait::async_trait;

use crate::rpc::messages::{LoginRequest, SignUpRequest, UserIdRequest, UserMessage, VersionReply};
use crate::rpc::{RpcChannel, AUTHORIZATION_SERVICE};
use crate::shared::error::Result;
use crate::usecase::ExecutionContext;
use crate::user::entity::{NewUser, User};

/// Typed client of the Authorization service.
#[async_trait]
pub trait AuthAgent: Send + Sync {
    /// Returns the new user's id.
    async fn sign_up(&self, ctx: &ExecutionContext, user: NewUser) -> Result<i64>;

    async fn login(&self, ctx: &ExecutionContext, username: &str, password: &str) -> Result<User>;

    /// Returns the bumped version.
    async fn logout(&self, ctx: &ExecutionContext, user_id: i64) -> Result<i64>;

    async fn get_user(&self, ctx: &ExecutionContext, user_id: i64) -> Result<User>;
}

pub struct RpcAuthAgent {
    channel: RpcChannel,
}

impl RpcAuthAgent {
    pub fn new(channel: RpcChannel) -> Self {
        Self { channel }
    }

    pub fn connect(base_url: &str) -> Result<Self> {
        Ok(Self::new(RpcChannel::connect(base_url, AUTHORIZATION_SERVICE)?))
    }
}

#[async_trait]
impl AuthAgent for RpcAuthAgent {
    async fn sign_up(&self, ctx: &ExecutionContext, user: NewUser) -> Result<i64> {
        let reply: UserIdRequest = self.channel.unary(ctx, "SignUp", &SignUpRequest::from(user)).await?;
        Ok(reply.user_id)
    }

    async fn login(&self, ctx: &ExecutionContext, username: &str, password: &str) -> Result<User> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let reply: UserMessage = self.channel.unary(ctx, "Login", &request).await?;
        reply.try_into()
    }

    async fn logout(&self, ctx: &ExecutionContext, user_id: i64) -> Result<i64> {
        let reply: VersionReply = self.channel.unary(ctx, "Logout", &UserIdRequest { user_id }).await?;
        Ok(reply.version)
    }

    async fn get_user(&self, ctx: &ExecutionContext, user_id: i64) -> Result<User> {
        let reply: UserMessage = self.channel.unary(ctx, "GetUserById", &UserIdRequest { user_id }).await?;
        reply.try_into()
    }
}
