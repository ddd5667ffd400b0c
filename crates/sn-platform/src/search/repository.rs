//! Search Repository
//!
//! Full-text matching over entity names. A row matches when the parsed
//! query hits its `simple` tsvector, or when the name starts with the raw
//! input (so short prefixes like "go" still find "Gorillaz").

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

use crate::album::entity::Album;
use crate::album::repository::{AlbumRow, ALBUM_COLUMNS};
use crate::artist::entity::Artist;
use crate::artist::repository::{ArtistRow, ARTIST_COLUMNS};
use crate::playlist::entity::Playlist;
use crate::playlist::repository::{PlaylistRow, PLAYLIST_COLUMNS};
use crate::shared::db::escape_like;
use crate::shared::error::Result;
use crate::track::entity::Track;
use crate::track::repository::{TrackRow, TRACK_COLUMNS};

/// Source of ranked matches for the Search service.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn albums(&self, query: &str, amount: u32) -> Result<Vec<Album>>;
    async fn artists(&self, query: &str, amount: u32) -> Result<Vec<Artist>>;
    async fn tracks(&self, query: &str, amount: u32) -> Result<Vec<Track>>;
    async fn playlists(&self, query: &str, amount: u32) -> Result<Vec<Playlist>>;
}

pub struct PgSearchRepository {
    pool: PgPool,
}

impl PgSearchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find<R, T>(&self, table: &str, alias: &str, columns: &str, query: &str, amount: u32) -> Result<Vec<T>>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        T: From<R>,
    {
        let query = query.trim();
        if query.is_empty() || amount == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, R>(&search_sql(table, alias, columns))
            .bind(query)
            .bind(format!("{}%", escape_like(query)))
            .bind(i64::from(amount))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(T::from).collect())
    }
}

/// `$1` query text, `$2` escaped prefix pattern, `$3` limit.
fn search_sql(table: &str, alias: &str, columns: &str) -> String {
    format!(
        "SELECT {columns} FROM {table} {alias} \
         WHERE to_tsvector('simple', {alias}.name) @@ plainto_tsquery('simple', $1) \
            OR {alias}.name ILIKE $2 \
         ORDER BY ts_rank(to_tsvector('simple', {alias}.name), plainto_tsquery('simple', $1)) DESC, {alias}.id \
         LIMIT $3"
    )
}

#[async_trait]
impl SearchIndex for PgSearchRepository {
    async fn albums(&self, query: &str, amount: u32) -> Result<Vec<Album>> {
        self.find::<AlbumRow, _>("album", "al", ALBUM_COLUMNS, query, amount).await
    }

    async fn artists(&self, query: &str, amount: u32) -> Result<Vec<Artist>> {
        self.find::<ArtistRow, _>("artist", "ar", ARTIST_COLUMNS, query, amount).await
    }

    async fn tracks(&self, query: &str, amount: u32) -> Result<Vec<Track>> {
        self.find::<TrackRow, _>("track", "t", TRACK_COLUMNS, query, amount).await
    }

    async fn playlists(&self, query: &str, amount: u32) -> Result<Vec<Playlist>> {
        self.find::<PlaylistRow, _>("playlist", "p", PLAYLIST_COLUMNS, query, amount).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_sql_uses_alias_throughout() {
        let sql = search_sql("album", "al", ALBUM_COLUMNS);
        assert!(sql.starts_with("SELECT al.id, al.name"));
        assert!(sql.contains("FROM album al"));
        assert!(sql.contains("al.name ILIKE $2"));
        assert!(sql.contains("ts_rank(to_tsvector('simple', al.name)"));
        assert!(sql.ends_with("LIMIT $3"));
    }
}
