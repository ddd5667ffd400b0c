//! Album Repository

use sqlx::PgPool;

use super::entity::{Album, NewAlbum};
use crate::shared::db::{acquire, Tx};
use crate::shared::error::{PlatformError, Result};

pub(crate) const ALBUM_COLUMNS: &str = "al.id, al.name, al.description, al.cover_src";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AlbumRow {
    id: i64,
    name: String,
    description: Option<String>,
    cover_src: String,
}

impl From<AlbumRow> for Album {
    fn from(row: AlbumRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            cover_src: row.cover_src,
        }
    }
}

pub struct AlbumRepository {
    pool: PgPool,
}

impl AlbumRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the album and link all of its artists.
    pub async fn insert(&self, tx: Tx<'_>, album: &NewAlbum) -> Result<i64> {
        let mut conn = acquire(&self.pool, tx).await?;
        let id: i64 = sqlx::query_scalar("INSERT INTO album (name, description) VALUES ($1, $2) RETURNING id")
            .bind(album.name.trim())
            .bind(&album.description)
            .fetch_one(&mut *conn)
            .await?;

        sqlx::query("INSERT INTO artist_album (artist_id, album_id) SELECT unnest($1::bigint[]), $2 ON CONFLICT DO NOTHING")
            .bind(&album.artist_ids)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(id)
    }

    pub async fn find_by_id(&self, tx: Tx<'_>, id: i64) -> Result<Album> {
        let mut conn = acquire(&self.pool, tx).await?;
        let row = sqlx::query_as::<_, AlbumRow>(&format!("SELECT {} FROM album al WHERE al.id = $1", ALBUM_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Album::from).ok_or_else(|| PlatformError::not_found("album", id))
    }

    pub async fn find_by_artist(&self, tx: Tx<'_>, artist_id: i64) -> Result<Vec<Album>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, AlbumRow>(&format!(
            "SELECT {} FROM album al JOIN artist_album aa ON aa.album_id = al.id WHERE aa.artist_id = $1 ORDER BY al.id",
            ALBUM_COLUMNS
        ))
        .bind(artist_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Album::from).collect())
    }

    pub async fn find_liked_by_user(&self, tx: Tx<'_>, user_id: i64) -> Result<Vec<Album>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, AlbumRow>(&format!(
            "SELECT {} FROM album al JOIN user_like_album l ON l.album_id = al.id WHERE l.user_id = $1 ORDER BY al.id",
            ALBUM_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Album::from).collect())
    }

    /// Newest albums first.
    pub async fn feed(&self, tx: Tx<'_>, limit: i64) -> Result<Vec<Album>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, AlbumRow>(&format!(
            "SELECT {} FROM album al ORDER BY al.id DESC LIMIT $1",
            ALBUM_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Album::from).collect())
    }

    pub async fn update_cover(&self, tx: Tx<'_>, id: i64, cover_src: &str) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        let result = sqlx::query("UPDATE album SET cover_src = $2 WHERE id = $1")
            .bind(id)
            .bind(cover_src)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("album", id));
        }
        Ok(())
    }

    /// Users managing any artist credited on the album.
    pub async fn owner_user_ids(&self, tx: Tx<'_>, id: i64) -> Result<Vec<i64>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let ids = sqlx::query_scalar(
            r#"
            SELECT DISTINCT ar.user_id FROM artist ar
            JOIN artist_album aa ON aa.artist_id = ar.id
            WHERE aa.album_id = $1 AND ar.user_id IS NOT NULL
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(ids)
    }

    /// Remove the album, its artist links and likes. Tracks stay, detached.
    pub async fn delete(&self, tx: Tx<'_>, id: i64) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        sqlx::query("DELETE FROM user_like_album WHERE album_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("UPDATE track SET album_id = NULL, album_position = NULL WHERE album_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM artist_album WHERE album_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        let result = sqlx::query("DELETE FROM album WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("album", id));
        }
        Ok(())
    }
}
