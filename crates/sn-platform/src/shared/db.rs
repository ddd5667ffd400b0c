//! PostgreSQL plumbing shared by every repository.
//!
//! Repositories never open transactions. Each method takes a [`Tx`]: either a
//! connection borrowed from a caller's transaction, or `None` to run on a
//! pooled connection. Use-cases own the transaction scope.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::{PgConnection, Postgres};
use tracing::info;

use sn_config::DatabaseConfig;

use crate::shared::error::{PlatformError, Result};

/// Bundled schema, applied at startup when `database.apply_schema` is set.
pub const SCHEMA: &str = include_str!("../../migrations/0001_schema.sql");

/// Optional transaction handle passed to repository methods.
pub type Tx<'a> = Option<&'a mut PgConnection>;

/// A connection that is either borrowed from an open transaction or checked
/// out of the pool for a single statement sequence.
pub enum Conn<'a> {
    Borrowed(&'a mut PgConnection),
    Pooled(PoolConnection<Postgres>),
}

impl Deref for Conn<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            Conn::Borrowed(conn) => conn,
            Conn::Pooled(conn) => conn,
        }
    }
}

impl DerefMut for Conn<'_> {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            Conn::Borrowed(conn) => conn,
            Conn::Pooled(conn) => conn,
        }
    }
}

/// Resolve a [`Tx`] into a usable connection.
pub async fn acquire<'a>(pool: &PgPool, tx: Tx<'a>) -> Result<Conn<'a>> {
    match tx {
        Some(conn) => Ok(Conn::Borrowed(conn)),
        None => Ok(Conn::Pooled(pool.acquire().await?)),
    }
}

/// Build the process-wide pool. Waiters queue in FIFO order once all
/// connections are checked out.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let ssl_mode: PgSslMode = config
        .sslmode
        .parse()
        .map_err(|_| PlatformError::internal(format!("invalid sslmode '{}'", config.sslmode)))?;

    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
        .ssl_mode(ssl_mode);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await?;

    info!(host = %config.host, database = %config.name, "Connected to PostgreSQL");
    Ok(pool)
}

/// Create any missing tables and indexes.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    info!("Database schema applied");
    Ok(())
}

/// Name of the violated unique constraint, if `err` is a unique violation.
pub fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => Some(db.constraint().unwrap_or("")),
        _ => None,
    }
}

/// Constraint name of a foreign key violation, if `err` is one.
pub fn foreign_key_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => Some(db.constraint().unwrap_or("")),
        _ => None,
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside LIKE.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("gor"), "gor");
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }

    #[test]
    fn test_unique_violation_ignores_other_errors() {
        assert!(unique_violation(&sqlx::Error::RowNotFound).is_none());
    }

    #[test]
    fn test_schema_is_idempotent_sql() {
        for line in SCHEMA.lines().filter(|l| l.starts_with("CREATE")) {
            assert!(line.contains("IF NOT EXISTS"), "{}", line);
        }
    }
}
