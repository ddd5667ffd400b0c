//! Playlist Repository
//!
//! Position maintenance assumes the caller holds the playlist row lock
//! (see [`PlaylistRepository::lock`]) for the duration of its transaction.

use sqlx::PgPool;
use tracing::debug;

use super::entity::{Playlist, PlaylistInfo, PositionShift};
use crate::shared::db::{acquire, Tx};
use crate::shared::error::{PlatformError, Result};

pub(crate) const PLAYLIST_COLUMNS: &str = "p.id, p.name, p.description, p.cover_src";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PlaylistRow {
    id: i64,
    name: String,
    description: Option<String>,
    cover_src: String,
}

impl From<PlaylistRow> for Playlist {
    fn from(row: PlaylistRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            cover_src: row.cover_src,
        }
    }
}

pub struct PlaylistRepository {
    pool: PgPool,
}

impl PlaylistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, tx: Tx<'_>, info: &PlaylistInfo) -> Result<i64> {
        let mut conn = acquire(&self.pool, tx).await?;
        let id = sqlx::query_scalar("INSERT INTO playlist (name, description) VALUES ($1, $2) RETURNING id")
            .bind(info.name.trim())
            .bind(&info.description)
            .fetch_one(&mut *conn)
            .await?;
        Ok(id)
    }

    /// Bind users as owners. Existing owners are left alone.
    pub async fn add_owners(&self, tx: Tx<'_>, id: i64, user_ids: &[i64]) -> Result<u64> {
        let mut conn = acquire(&self.pool, tx).await?;
        let result = sqlx::query(
            "INSERT INTO playlist_user (playlist_id, user_id) SELECT $1, unnest($2::bigint[]) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(user_ids)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn is_owner(&self, tx: Tx<'_>, id: i64, user_id: i64) -> Result<bool> {
        let mut conn = acquire(&self.pool, tx).await?;
        let owner =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM playlist_user WHERE playlist_id = $1 AND user_id = $2)")
                .bind(id)
                .bind(user_id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(owner)
    }

    pub async fn find_by_id(&self, tx: Tx<'_>, id: i64) -> Result<Playlist> {
        let mut conn = acquire(&self.pool, tx).await?;
        let row = sqlx::query_as::<_, PlaylistRow>(&format!("SELECT {} FROM playlist p WHERE p.id = $1", PLAYLIST_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Playlist::from).ok_or_else(|| PlatformError::not_found("playlist", id))
    }

    /// Take the row lock that serialises every position change on this
    /// playlist until the transaction ends.
    pub async fn lock(&self, tx: Tx<'_>, id: i64) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM playlist WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        found.map(|_| ()).ok_or_else(|| PlatformError::not_found("playlist", id))
    }

    /// Lock every playlist containing the track, in id order.
    pub async fn lock_containing_track(&self, tx: Tx<'_>, track_id: i64) -> Result<Vec<i64>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let ids = sqlx::query_scalar(
            r#"
            SELECT p.id FROM playlist p
            WHERE p.id IN (SELECT playlist_id FROM playlist_track WHERE track_id = $1)
            ORDER BY p.id
            FOR UPDATE
            "#,
        )
        .bind(track_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(ids)
    }

    pub async fn update_info(&self, tx: Tx<'_>, id: i64, info: &PlaylistInfo) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        let result = sqlx::query("UPDATE playlist SET name = $2, description = $3 WHERE id = $1")
            .bind(id)
            .bind(info.name.trim())
            .bind(&info.description)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("playlist", id));
        }
        Ok(())
    }

    pub async fn update_cover(&self, tx: Tx<'_>, id: i64, cover_src: &str) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        let result = sqlx::query("UPDATE playlist SET cover_src = $2 WHERE id = $1")
            .bind(id)
            .bind(cover_src)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("playlist", id));
        }
        Ok(())
    }

    pub async fn track_count(&self, tx: Tx<'_>, id: i64) -> Result<i64> {
        let mut conn = acquire(&self.pool, tx).await?;
        let count = sqlx::query_scalar("SELECT count(*) FROM playlist_track WHERE playlist_id = $1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    /// 0 for an empty playlist.
    pub async fn max_position(&self, tx: Tx<'_>, id: i64) -> Result<i32> {
        let mut conn = acquire(&self.pool, tx).await?;
        let max = sqlx::query_scalar("SELECT COALESCE(MAX(position), 0) FROM playlist_track WHERE playlist_id = $1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(max)
    }

    /// False when the track is already in the playlist.
    pub async fn insert_track(&self, tx: Tx<'_>, id: i64, track_id: i64, position: i32) -> Result<bool> {
        let mut conn = acquire(&self.pool, tx).await?;
        let result = sqlx::query(
            r#"
            INSERT INTO playlist_track (playlist_id, track_id, position)
            VALUES ($1, $2, $3)
            ON CONFLICT (playlist_id, track_id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(track_id)
        .bind(position)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn position_of(&self, tx: Tx<'_>, id: i64, track_id: i64) -> Result<Option<i32>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let position = sqlx::query_scalar("SELECT position FROM playlist_track WHERE playlist_id = $1 AND track_id = $2")
            .bind(id)
            .bind(track_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(position)
    }

    /// Move every other track inside `shift`'s range by its delta.
    pub async fn shift_positions(&self, tx: Tx<'_>, id: i64, moved_track: i64, shift: PositionShift) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        sqlx::query(
            r#"
            UPDATE playlist_track SET position = position + $4
            WHERE playlist_id = $1 AND track_id <> $5 AND position BETWEEN $2 AND $3
            "#,
        )
        .bind(id)
        .bind(shift.low)
        .bind(shift.high)
        .bind(shift.delta)
        .bind(moved_track)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn set_position(&self, tx: Tx<'_>, id: i64, track_id: i64, position: i32) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        sqlx::query("UPDATE playlist_track SET position = $3 WHERE playlist_id = $1 AND track_id = $2")
            .bind(id)
            .bind(track_id)
            .bind(position)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Delete the membership and close the gap it leaves. False when the
    /// track was not in the playlist.
    pub async fn remove_track(&self, tx: Tx<'_>, id: i64, track_id: i64) -> Result<bool> {
        let mut conn = acquire(&self.pool, tx).await?;
        let removed: Option<i32> = sqlx::query_scalar(
            "DELETE FROM playlist_track WHERE playlist_id = $1 AND track_id = $2 RETURNING position",
        )
        .bind(id)
        .bind(track_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(position) = removed else {
            return Ok(false);
        };

        sqlx::query("UPDATE playlist_track SET position = position - 1 WHERE playlist_id = $1 AND position > $2")
            .bind(id)
            .bind(position)
            .execute(&mut *conn)
            .await?;

        debug!(playlist_id = id, track_id, position, "Removed track from playlist");
        Ok(true)
    }

    /// Remove the playlist with its likes, owners and memberships.
    pub async fn delete(&self, tx: Tx<'_>, id: i64) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        for statement in [
            "DELETE FROM user_like_playlist WHERE playlist_id = $1",
            "DELETE FROM playlist_user WHERE playlist_id = $1",
            "DELETE FROM playlist_track WHERE playlist_id = $1",
        ] {
            sqlx::query(statement).bind(id).execute(&mut *conn).await?;
        }
        let result = sqlx::query("DELETE FROM playlist WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("playlist", id));
        }
        Ok(())
    }

    pub async fn find_by_user(&self, tx: Tx<'_>, user_id: i64) -> Result<Vec<Playlist>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, PlaylistRow>(&format!(
            "SELECT {} FROM playlist p JOIN playlist_user pu ON pu.playlist_id = p.id WHERE pu.user_id = $1 ORDER BY p.id",
            PLAYLIST_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Playlist::from).collect())
    }

    pub async fn find_liked_by_user(&self, tx: Tx<'_>, user_id: i64) -> Result<Vec<Playlist>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, PlaylistRow>(&format!(
            "SELECT {} FROM playlist p JOIN user_like_playlist l ON l.playlist_id = p.id WHERE l.user_id = $1 ORDER BY p.id",
            PLAYLIST_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Playlist::from).collect())
    }

    /// Most liked playlists first.
    pub async fn feed(&self, tx: Tx<'_>, limit: i64) -> Result<Vec<Playlist>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, PlaylistRow>(&format!(
            r#"
            SELECT {} FROM playlist p
            LEFT JOIN user_like_playlist l ON l.playlist_id = p.id
            GROUP BY p.id
            ORDER BY count(l.user_id) DESC, p.id DESC
            LIMIT $1
            "#,
            PLAYLIST_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Playlist::from).collect())
    }

    /// `(track_id, position)` pairs in position order.
    pub async fn positions(&self, tx: Tx<'_>, id: i64) -> Result<Vec<(i64, i32)>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as("SELECT track_id, position FROM playlist_track WHERE playlist_id = $1 ORDER BY position")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }
}
