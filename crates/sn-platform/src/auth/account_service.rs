//! Account Service
//!
//! Sign-up, login, logout and identity lookup backing the Authorization
//! RPC service. The API server reaches it only through [`AuthAgent`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::agent::AuthAgent;
use crate::auth::password_service::PasswordService;
use crate::shared::error::{PlatformError, Result};
use crate::usecase::ExecutionContext;
use crate::user::entity::{NewUser, User};
use crate::user::repository::UserRepository;

pub struct AccountService {
    users: Arc<UserRepository>,
    passwords: Arc<PasswordService>,
}

impl AccountService {
    pub fn new(users: Arc<UserRepository>, passwords: Arc<PasswordService>) -> Self {
        Self { users, passwords }
    }

    pub async fn sign_up(&self, user: NewUser) -> Result<i64> {
        user.validate(Utc::now().date_naive())?;
        let credentials = self.passwords.hash_password(&user.password)?;
        let id = self.users.insert(None, &user, &credentials).await?;

        info!(user_id = id, username = %user.username, "User signed up");
        Ok(id)
    }

    /// Unknown usernames are `NotFound`; a wrong password is
    /// `InvalidCredential`.
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let (user, credentials) = self.users.find_by_username(None, username).await?;
        if !self.passwords.verify_password(password, &credentials)? {
            warn!(user_id = user.id, "Login rejected");
            return Err(PlatformError::InvalidCredential);
        }

        info!(user_id = user.id, "User logged in");
        Ok(user)
    }

    /// Invalidate every session of the user. Returns the new version.
    pub async fn logout(&self, user_id: i64) -> Result<i64> {
        let version = self.users.increment_version(None, user_id).await?;
        info!(user_id, version, "User logged out");
        Ok(version)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        self.users.find_by_id(None, user_id).await
    }
}

/// In-process agent, for deployments that run the account store next to
/// the API server and for tests.
#[async_trait]
impl AuthAgent for AccountService {
    async fn sign_up(&self, _ctx: &ExecutionContext, user: NewUser) -> Result<i64> {
        AccountService::sign_up(self, user).await
    }

    async fn login(&self, _ctx: &ExecutionContext, username: &str, password: &str) -> Result<User> {
        AccountService::login(self, username, password).await
    }

    async fn logout(&self, _ctx: &ExecutionContext, user_id: i64) -> Result<i64> {
        AccountService::logout(self, user_id).await
    }

    async fn get_user(&self, _ctx: &ExecutionContext, user_id: i64) -> Result<User> {
        AccountService::get_user(self, user_id).await
    }
}
