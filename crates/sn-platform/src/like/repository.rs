//! Like Repository
//!
//! One set table per likeable kind. Writes report whether a row actually
//! changed so callers get idempotent semantics without re-reading.

use std::collections::HashSet;
use std::fmt;

use sqlx::PgPool;

use crate::shared::db::{acquire, foreign_key_violation, Tx};
use crate::shared::error::{PlatformError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeTarget {
    Track,
    Album,
    Artist,
    Playlist,
}

impl LikeTarget {
    /// Entity name used in errors and logs.
    pub fn entity(self) -> &'static str {
        match self {
            LikeTarget::Track => "track",
            LikeTarget::Album => "album",
            LikeTarget::Artist => "artist",
            LikeTarget::Playlist => "playlist",
        }
    }

    fn like_table(self) -> &'static str {
        match self {
            LikeTarget::Track => "user_like_track",
            LikeTarget::Album => "user_like_album",
            LikeTarget::Artist => "user_like_artist",
            LikeTarget::Playlist => "user_like_playlist",
        }
    }

    /// Default name Postgres gives the `user_id` foreign key.
    fn user_fkey(self) -> String {
        format!("{}_user_id_fkey", self.like_table())
    }

    fn target_column(self) -> &'static str {
        match self {
            LikeTarget::Track => "track_id",
            LikeTarget::Album => "album_id",
            LikeTarget::Artist => "artist_id",
            LikeTarget::Playlist => "playlist_id",
        }
    }
}

impl fmt::Display for LikeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity())
    }
}

pub struct LikeRepository {
    pool: PgPool,
}

impl LikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// True when the like is new. A missing target is `NotFound`.
    ///
    /// A single insert; the foreign keys decide whether the target exists,
    /// so a target deleted concurrently is reported the same way.
    pub async fn like(&self, tx: Tx<'_>, user_id: i64, target: LikeTarget, id: i64) -> Result<bool> {
        let mut conn = acquire(&self.pool, tx).await?;
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            target.like_table(),
            target.target_column()
        ))
        .bind(user_id)
        .bind(id)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(result) => Ok(result.rows_affected() == 1),
            Err(err) => match foreign_key_violation(&err) {
                Some(constraint) if constraint == target.user_fkey() => Err(PlatformError::not_found("user", user_id)),
                Some(_) => Err(PlatformError::not_found(target.entity(), id)),
                None => Err(err.into()),
            },
        }
    }

    /// True when a like was removed.
    pub async fn unlike(&self, tx: Tx<'_>, user_id: i64, target: LikeTarget, id: i64) -> Result<bool> {
        let mut conn = acquire(&self.pool, tx).await?;
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
            target.like_table(),
            target.target_column()
        ))
        .bind(user_id)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Those of `ids` the user has liked.
    pub async fn liked_ids(&self, tx: Tx<'_>, user_id: i64, target: LikeTarget, ids: &[i64]) -> Result<HashSet<i64>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let mut conn = acquire(&self.pool, tx).await?;
        let liked: Vec<i64> = sqlx::query_scalar(&format!(
            "SELECT {col} FROM {table} WHERE user_id = $1 AND {col} = ANY($2)",
            col = target.target_column(),
            table = target.like_table()
        ))
        .bind(user_id)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;
        Ok(liked.into_iter().collect())
    }
}
