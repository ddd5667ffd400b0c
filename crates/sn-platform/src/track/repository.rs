//! Track Repository

use sqlx::PgPool;

use super::entity::{NewTrack, Track};
use crate::shared::db::{acquire, Tx};
use crate::shared::error::{PlatformError, Result};

pub(crate) const TRACK_COLUMNS: &str =
    "t.id, t.name, t.album_id, t.album_position, t.cover_src, t.record_src, t.duration, t.listens";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TrackRow {
    id: i64,
    name: String,
    album_id: Option<i64>,
    album_position: Option<i32>,
    cover_src: String,
    record_src: String,
    duration: i32,
    listens: i64,
}

impl From<TrackRow> for Track {
    fn from(row: TrackRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            album_id: row.album_id,
            album_position: row.album_position,
            cover_src: row.cover_src,
            record_src: row.record_src,
            duration: row.duration,
            listens: row.listens,
        }
    }
}

pub struct TrackRepository {
    pool: PgPool,
}

impl TrackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the track and link all of its artists.
    pub async fn insert(&self, tx: Tx<'_>, track: &NewTrack, cover_src: &str, record_src: &str) -> Result<i64> {
        let mut conn = acquire(&self.pool, tx).await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO track (name, album_id, album_position, cover_src, record_src, duration)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(track.name.trim())
        .bind(track.album_id)
        .bind(track.album_position)
        .bind(cover_src)
        .bind(record_src)
        .bind(track.duration)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query("INSERT INTO artist_track (artist_id, track_id) SELECT unnest($1::bigint[]), $2 ON CONFLICT DO NOTHING")
            .bind(&track.artist_ids)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(id)
    }

    pub async fn find_by_id(&self, tx: Tx<'_>, id: i64) -> Result<Track> {
        let mut conn = acquire(&self.pool, tx).await?;
        let row = sqlx::query_as::<_, TrackRow>(&format!("SELECT {} FROM track t WHERE t.id = $1", TRACK_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Track::from).ok_or_else(|| PlatformError::not_found("track", id))
    }

    pub async fn find_by_album(&self, tx: Tx<'_>, album_id: i64) -> Result<Vec<Track>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, TrackRow>(&format!(
            "SELECT {} FROM track t WHERE t.album_id = $1 ORDER BY t.album_position NULLS LAST, t.id",
            TRACK_COLUMNS
        ))
        .bind(album_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Track::from).collect())
    }

    pub async fn find_by_artist(&self, tx: Tx<'_>, artist_id: i64) -> Result<Vec<Track>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, TrackRow>(&format!(
            "SELECT {} FROM track t JOIN artist_track at ON at.track_id = t.id WHERE at.artist_id = $1 ORDER BY t.id",
            TRACK_COLUMNS
        ))
        .bind(artist_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Track::from).collect())
    }

    /// Tracks of a playlist in position order.
    pub async fn find_by_playlist(&self, tx: Tx<'_>, playlist_id: i64) -> Result<Vec<Track>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, TrackRow>(&format!(
            "SELECT {} FROM track t JOIN playlist_track pt ON pt.track_id = t.id WHERE pt.playlist_id = $1 ORDER BY pt.position",
            TRACK_COLUMNS
        ))
        .bind(playlist_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Track::from).collect())
    }

    pub async fn find_liked_by_user(&self, tx: Tx<'_>, user_id: i64) -> Result<Vec<Track>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, TrackRow>(&format!(
            "SELECT {} FROM track t JOIN user_like_track l ON l.track_id = t.id WHERE l.user_id = $1 ORDER BY t.id",
            TRACK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Track::from).collect())
    }

    /// Most listened tracks first.
    pub async fn feed(&self, tx: Tx<'_>, limit: i64) -> Result<Vec<Track>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, TrackRow>(&format!(
            "SELECT {} FROM track t ORDER BY t.listens DESC, t.id DESC LIMIT $1",
            TRACK_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Track::from).collect())
    }

    /// Users managing any artist credited on the track.
    pub async fn owner_user_ids(&self, tx: Tx<'_>, id: i64) -> Result<Vec<i64>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let ids = sqlx::query_scalar(
            r#"
            SELECT DISTINCT ar.user_id FROM artist ar
            JOIN artist_track at ON at.artist_id = ar.id
            WHERE at.track_id = $1 AND ar.user_id IS NOT NULL
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(ids)
    }

    /// Remove the track row with its artist links and likes. Playlist
    /// memberships must already be gone.
    pub async fn delete(&self, tx: Tx<'_>, id: i64) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        sqlx::query("DELETE FROM user_like_track WHERE track_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM artist_track WHERE track_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        let result = sqlx::query("DELETE FROM track WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("track", id));
        }
        Ok(())
    }
}
