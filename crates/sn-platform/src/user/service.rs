//! User Service
//!
//! Profile reads and edits, password changes and avatar storage. Backs the
//! User RPC service; the API server reaches it through [`UserAgent`].

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::password_service::PasswordService;
use crate::blob::BlobStore;
use crate::shared::error::{PlatformError, Result};
use crate::shared::file::{store_upload, MediaType, UploadPolicy};
use crate::usecase::{ExecutionContext, PgUnitOfWork};
use crate::user::agent::UserAgent;
use crate::user::entity::{User, UserUpdate};
use crate::user::repository::UserRepository;

pub struct UserService {
    uow: PgUnitOfWork,
    users: Arc<UserRepository>,
    passwords: Arc<PasswordService>,
    blobs: Arc<dyn BlobStore>,
    avatar_policy: UploadPolicy,
}

impl UserService {
    pub fn new(
        uow: PgUnitOfWork,
        users: Arc<UserRepository>,
        passwords: Arc<PasswordService>,
        blobs: Arc<dyn BlobStore>,
        avatar_policy: UploadPolicy,
    ) -> Self {
        Self {
            uow,
            users,
            passwords,
            blobs,
            avatar_policy,
        }
    }

    pub fn avatar_limit(&self) -> usize {
        self.avatar_policy.max_size
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        self.users.find_by_id(None, user_id).await
    }

    pub async fn update_info(&self, update: UserUpdate) -> Result<()> {
        update.validate(Utc::now().date_naive())?;
        self.users.update_info(None, &update).await?;
        info!(user_id = update.id, "Profile updated");
        Ok(())
    }

    /// Verifies the old password, stores the new one and bumps the version.
    /// Returns the new version.
    pub async fn update_password(&self, user_id: i64, old_password: &str, new_password: &str) -> Result<i64> {
        let mut tx = self.uow.begin().await?;

        let current = self.users.find_credentials(Some(&mut *tx), user_id).await?;
        if !self.passwords.verify_password(old_password, &current)? {
            warn!(user_id, "Password change rejected");
            return Err(PlatformError::forbidden("old password does not match"));
        }

        let credentials = self.passwords.hash_password(new_password)?;
        let version = self.users.update_password(Some(&mut *tx), user_id, &credentials).await?;
        tx.commit().await?;

        info!(user_id, version, "Password changed");
        Ok(version)
    }

    /// Store the avatar and point the profile at it. `extension` is the one
    /// the client declared; it must name an allowed type.
    pub async fn upload_avatar(&self, user_id: i64, extension: &str, data: Bytes) -> Result<String> {
        let declared = MediaType::from_extension(extension).filter(|m| self.avatar_policy.allowed.contains(m));
        if declared.is_none() {
            return Err(PlatformError::UnsupportedMediaType {
                mime: format!("*.{}", extension),
            });
        }

        self.users.find_by_id(None, user_id).await?;
        let stored = store_upload(self.blobs.as_ref(), &self.avatar_policy, data).await?;
        self.users.update_avatar(None, user_id, &stored.path).await?;

        info!(user_id, path = %stored.path, created = stored.created, "Avatar updated");
        Ok(stored.path)
    }

    pub async fn users_by_playlist(&self, playlist_id: i64) -> Result<Vec<User>> {
        self.users.find_by_playlist(None, playlist_id).await
    }
}

/// In-process agent, for single-process deployments and tests.
#[async_trait]
impl UserAgent for UserService {
    async fn get_user(&self, _ctx: &ExecutionContext, user_id: i64) -> Result<User> {
        UserService::get_user(self, user_id).await
    }

    async fn update_info(&self, _ctx: &ExecutionContext, update: UserUpdate) -> Result<()> {
        UserService::update_info(self, update).await
    }

    async fn update_password(
        &self,
        _ctx: &ExecutionContext,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<i64> {
        UserService::update_password(self, user_id, old_password, new_password).await
    }

    async fn upload_avatar(
        &self,
        _ctx: &ExecutionContext,
        user_id: i64,
        extension: &str,
        data: Bytes,
    ) -> Result<String> {
        UserService::upload_avatar(self, user_id, extension, data).await
    }

    async fn users_by_playlist(&self, _ctx: &ExecutionContext, playlist_id: i64) -> Result<Vec<User>> {
        UserService::users_by_playlist(self, playlist_id).await
    }
}
