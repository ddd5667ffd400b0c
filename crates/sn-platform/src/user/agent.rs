//! User service agent

use async_trait::async_trait;
use bytes::Bytes;

use crate::rpc::messages::{
    AvatarExtra, AvatarPathReply, Empty, PlaylistIdRequest, UpdateInfoRequest, UpdatePasswordRequest, UserIdRequest,
    UserMessage, UsersReply, VersionReply,
};
use crate::rpc::{RpcChannel, UPLOAD_CHUNK_SIZE, USER_SERVICE};
use crate::shared::error::Result;
use crate::usecase::ExecutionContext;
use crate::user::entity::{User, UserUpdate};

/// Typed client of the User service.
#[async_trait]
pub trait UserAgent: Send + Sync {
    async fn get_user(&self, ctx: &ExecutionContext, user_id: i64) -> Result<User>;

    async fn update_info(&self, ctx: &ExecutionContext, update: UserUpdate) -> Result<()>;

    /// Returns the bumped version.
    async fn update_password(
        &self,
        ctx: &ExecutionContext,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<i64>;

    /// Streams `data` to the service and returns the stored avatar path.
    async fn upload_avatar(&self, ctx: &ExecutionContext, user_id: i64, extension: &str, data: Bytes)
        -> Result<String>;

    async fn users_by_playlist(&self, ctx: &ExecutionContext, playlist_id: i64) -> Result<Vec<User>>;
}

/// Split `data` into upload chunks without copying.
pub fn upload_chunks(data: Bytes, size: usize) -> Vec<Bytes> {
    let mut chunks = Vec::with_capacity(data.len().div_ceil(size));
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + size).min(data.len());
        chunks.push(data.slice(offset..end));
        offset = end;
    }
    chunks
}

pub struct RpcUserAgent {
    channel: RpcChannel,
}

impl RpcUserAgent {
    pub fn new(channel: RpcChannel) -> Self {
        Self { channel }
    }

    pub fn connect(base_url: &str) -> Result<Self> {
        Ok(Self::new(RpcChannel::connect(base_url, USER_SERVICE)?))
    }
}

#[async_trait]
impl UserAgent for RpcUserAgent {
    async fn get_user(&self, ctx: &ExecutionContext, user_id: i64) -> Result<User> {
        let reply: UserMessage = self.channel.unary(ctx, "GetUserById", &UserIdRequest { user_id }).await?;
        reply.try_into()
    }

    async fn update_info(&self, ctx: &ExecutionContext, update: UserUpdate) -> Result<()> {
        let _: Empty = self
            .channel
            .unary(ctx, "UpdateInfo", &UpdateInfoRequest::from(update))
            .await?;
        Ok(())
    }

    async fn update_password(
        &self,
        ctx: &ExecutionContext,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<i64> {
        let request = UpdatePasswordRequest {
            user_id,
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        let reply: VersionReply = self.channel.unary(ctx, "UpdatePassword", &request).await?;
        Ok(reply.version)
    }

    async fn upload_avatar(
        &self,
        ctx: &ExecutionContext,
        user_id: i64,
        extension: &str,
        data: Bytes,
    ) -> Result<String> {
        let extra = AvatarExtra {
            user_id,
            extension: extension.to_string(),
        };
        let chunks = upload_chunks(data, UPLOAD_CHUNK_SIZE);
        let reply: AvatarPathReply = self.channel.client_streaming(ctx, "UploadAvatar", &extra, chunks).await?;
        Ok(reply.path)
    }

    async fn users_by_playlist(&self, ctx: &ExecutionContext, playlist_id: i64) -> Result<Vec<User>> {
        let reply: UsersReply = self
            .channel
            .unary(ctx, "GetUsersByPlaylist", &PlaylistIdRequest { playlist_id })
            .await?;
        reply.users.into_iter().map(User::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_chunks() {
        let data = Bytes::from(vec![7u8; 2500]);
        let chunks = upload_chunks(data, 1024);
        assert_eq!(chunks.iter().map(Bytes::len).collect::<Vec<_>>(), vec![1024, 1024, 452]);
        assert!(upload_chunks(Bytes::new(), 1024).is_empty());
    }
}
