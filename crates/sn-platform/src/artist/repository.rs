//! Artist Repository

use sqlx::PgPool;

use super::entity::{Artist, ArtistRef, NewArtist};
use crate::shared::db::{acquire, Tx};
use crate::shared::error::{PlatformError, Result};

pub(crate) const ARTIST_COLUMNS: &str = "ar.id, ar.name, ar.user_id, ar.avatar_src";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArtistRow {
    id: i64,
    name: String,
    user_id: Option<i64>,
    avatar_src: String,
}

impl From<ArtistRow> for Artist {
    fn from(row: ArtistRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            user_id: row.user_id,
            avatar_src: row.avatar_src,
        }
    }
}

/// An artist reference keyed by the album or track it belongs to.
#[derive(Debug, sqlx::FromRow)]
struct LinkedArtistRow {
    owner_id: i64,
    id: i64,
    name: String,
}

pub struct ArtistRepository {
    pool: PgPool,
}

impl ArtistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, tx: Tx<'_>, artist: &NewArtist) -> Result<i64> {
        let mut conn = acquire(&self.pool, tx).await?;
        let id = sqlx::query_scalar("INSERT INTO artist (name, user_id, avatar_src) VALUES ($1, $2, $3) RETURNING id")
            .bind(artist.name.trim())
            .bind(artist.user_id)
            .bind(&artist.avatar_src)
            .fetch_one(&mut *conn)
            .await?;
        Ok(id)
    }

    pub async fn find_by_id(&self, tx: Tx<'_>, id: i64) -> Result<Artist> {
        let mut conn = acquire(&self.pool, tx).await?;
        let row = sqlx::query_as::<_, ArtistRow>(&format!("SELECT {} FROM artist ar WHERE ar.id = $1", ARTIST_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Artist::from).ok_or_else(|| PlatformError::not_found("artist", id))
    }

    pub async fn find_by_album(&self, tx: Tx<'_>, album_id: i64) -> Result<Vec<Artist>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, ArtistRow>(&format!(
            "SELECT {} FROM artist ar JOIN artist_album aa ON aa.artist_id = ar.id WHERE aa.album_id = $1 ORDER BY ar.id",
            ARTIST_COLUMNS
        ))
        .bind(album_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Artist::from).collect())
    }

    pub async fn find_by_track(&self, tx: Tx<'_>, track_id: i64) -> Result<Vec<Artist>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, ArtistRow>(&format!(
            "SELECT {} FROM artist ar JOIN artist_track at ON at.artist_id = ar.id WHERE at.track_id = $1 ORDER BY ar.id",
            ARTIST_COLUMNS
        ))
        .bind(track_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Artist::from).collect())
    }

    pub async fn find_liked_by_user(&self, tx: Tx<'_>, user_id: i64) -> Result<Vec<Artist>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, ArtistRow>(&format!(
            "SELECT {} FROM artist ar JOIN user_like_artist l ON l.artist_id = ar.id WHERE l.user_id = $1 ORDER BY ar.id",
            ARTIST_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Artist::from).collect())
    }

    /// Most liked artists first.
    pub async fn feed(&self, tx: Tx<'_>, limit: i64) -> Result<Vec<Artist>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, ArtistRow>(&format!(
            r#"
            SELECT {} FROM artist ar
            LEFT JOIN user_like_artist l ON l.artist_id = ar.id
            GROUP BY ar.id
            ORDER BY count(l.user_id) DESC, ar.id DESC
            LIMIT $1
            "#,
            ARTIST_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Artist::from).collect())
    }

    /// Artist references for a batch of albums, as `(album_id, artist)`.
    pub async fn refs_for_albums(&self, tx: Tx<'_>, album_ids: &[i64]) -> Result<Vec<(i64, ArtistRef)>> {
        self.linked_refs(tx, "artist_album", "album_id", album_ids).await
    }

    /// Artist references for a batch of tracks, as `(track_id, artist)`.
    pub async fn refs_for_tracks(&self, tx: Tx<'_>, track_ids: &[i64]) -> Result<Vec<(i64, ArtistRef)>> {
        self.linked_refs(tx, "artist_track", "track_id", track_ids).await
    }

    async fn linked_refs(
        &self,
        tx: Tx<'_>,
        link_table: &str,
        owner_column: &str,
        owner_ids: &[i64],
    ) -> Result<Vec<(i64, ArtistRef)>> {
        if owner_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, LinkedArtistRow>(&format!(
            r#"
            SELECT l.{owner} AS owner_id, ar.id, ar.name
            FROM {link} l JOIN artist ar ON ar.id = l.artist_id
            WHERE l.{owner} = ANY($1)
            ORDER BY l.{owner}, ar.id
            "#,
            owner = owner_column,
            link = link_table
        ))
        .bind(owner_ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.owner_id, ArtistRef { id: row.id, name: row.name }))
            .collect())
    }

    /// Those of `artist_ids` managed by `user_id`.
    pub async fn owned_by(&self, tx: Tx<'_>, user_id: i64, artist_ids: &[i64]) -> Result<Vec<i64>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let ids = sqlx::query_scalar("SELECT id FROM artist WHERE user_id = $1 AND id = ANY($2) ORDER BY id")
            .bind(user_id)
            .bind(artist_ids)
            .fetch_all(&mut *conn)
            .await?;
        Ok(ids)
    }

    /// Albums for which this artist is the only credited artist.
    pub async fn sole_artist_album_count(&self, tx: Tx<'_>, artist_id: i64) -> Result<i64> {
        let mut conn = acquire(&self.pool, tx).await?;
        let count = sqlx::query_scalar(
            r#"
            SELECT count(*) FROM artist_album aa
            WHERE aa.artist_id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM artist_album o WHERE o.album_id = aa.album_id AND o.artist_id <> $1
              )
            "#,
        )
        .bind(artist_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(count)
    }

    /// Remove the artist with its album and track links and likes.
    pub async fn delete(&self, tx: Tx<'_>, id: i64) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        sqlx::query("DELETE FROM user_like_artist WHERE artist_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM artist_album WHERE artist_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM artist_track WHERE artist_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        let result = sqlx::query("DELETE FROM artist WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("artist", id));
        }
        Ok(())
    }
}
