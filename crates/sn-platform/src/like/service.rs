//! Like Service

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use super::repository::{LikeRepository, LikeTarget};
use crate::shared::error::Result;
use crate::usecase::ExecutionContext;

pub struct LikeService {
    likes: Arc<LikeRepository>,
}

impl LikeService {
    pub fn new(likes: Arc<LikeRepository>) -> Self {
        Self { likes }
    }

    /// Returns whether the like is new.
    pub async fn like(&self, ctx: &ExecutionContext, target: LikeTarget, id: i64) -> Result<bool> {
        let caller = ctx.require_caller()?;
        let changed = self.likes.like(None, caller.id, target, id).await?;
        info!(user_id = caller.id, target = %target, target_id = id, changed, "Like");
        Ok(changed)
    }

    /// Returns whether a like was removed.
    pub async fn unlike(&self, ctx: &ExecutionContext, target: LikeTarget, id: i64) -> Result<bool> {
        let caller = ctx.require_caller()?;
        let changed = self.likes.unlike(None, caller.id, target, id).await?;
        info!(user_id = caller.id, target = %target, target_id = id, changed, "Unlike");
        Ok(changed)
    }

    /// Ids among `ids` liked by the caller; always empty for anonymous callers.
    pub async fn liked_set(&self, ctx: &ExecutionContext, target: LikeTarget, ids: &[i64]) -> Result<HashSet<i64>> {
        match ctx.caller_id() {
            Some(user_id) => self.likes.liked_ids(None, user_id, target, ids).await,
            None => Ok(HashSet::new()),
        }
    }
}
