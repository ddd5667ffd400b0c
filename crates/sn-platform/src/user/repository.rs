//! User Repository

use chrono::NaiveDate;
use sqlx::{FromRow, PgPool, Row};
use tracing::debug;

use super::entity::{Credentials, NewUser, User, UserUpdate};
use crate::shared::db::{acquire, unique_violation, Tx};
use crate::shared::error::{PlatformError, Result};

const USER_COLUMNS: &str =
    "u.id, u.version, u.username, u.email, u.first_name, u.last_name, u.sex, u.birth_date, u.avatar_src";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    version: i64,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    sex: String,
    birth_date: NaiveDate,
    avatar_src: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = PlatformError;

    fn try_from(row: UserRow) -> Result<Self> {
        let sex = row
            .sex
            .parse()
            .map_err(|_| PlatformError::internal(format!("user {} has invalid sex '{}'", row.id, row.sex)))?;
        Ok(User {
            id: row.id,
            version: row.version,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            sex,
            birth_date: row.birth_date,
            avatar_src: row.avatar_src,
        })
    }
}

/// Map unique violations on `users` to the field that collided.
fn map_unique(err: sqlx::Error) -> PlatformError {
    match unique_violation(&err) {
        Some(constraint) if constraint.contains("email") => PlatformError::duplicate("user", "email"),
        Some(_) => PlatformError::duplicate("user", "username"),
        None => err.into(),
    }
}

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, tx: Tx<'_>, user: &NewUser, credentials: &Credentials) -> Result<i64> {
        let mut conn = acquire(&self.pool, tx).await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, password_hash, salt, first_name, last_name, sex, birth_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&credentials.password_hash)
        .bind(&credentials.salt)
        .bind(user.first_name.trim())
        .bind(user.last_name.trim())
        .bind(user.sex.as_str())
        .bind(user.birth_date)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_unique)?;

        debug!(user_id = id, username = %user.username, "Inserted user");
        Ok(id)
    }

    pub async fn find_by_id(&self, tx: Tx<'_>, id: i64) -> Result<User> {
        let mut conn = acquire(&self.pool, tx).await?;
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users u WHERE u.id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.ok_or_else(|| PlatformError::not_found("user", id))?.try_into()
    }

    /// Look up a user and their password material by username.
    pub async fn find_by_username(&self, tx: Tx<'_>, username: &str) -> Result<(User, Credentials)> {
        let mut conn = acquire(&self.pool, tx).await?;
        let row = sqlx::query(&format!(
            "SELECT {}, u.password_hash, u.salt FROM users u WHERE u.username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| PlatformError::not_found("user", username))?;

        let credentials = Credentials {
            password_hash: row.try_get("password_hash")?,
            salt: row.try_get("salt")?,
        };
        let user: User = UserRow::from_row(&row)?.try_into()?;
        Ok((user, credentials))
    }

    pub async fn find_credentials(&self, tx: Tx<'_>, id: i64) -> Result<Credentials> {
        let mut conn = acquire(&self.pool, tx).await?;
        let row = sqlx::query("SELECT password_hash, salt FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| PlatformError::not_found("user", id))?;

        Ok(Credentials {
            password_hash: row.try_get("password_hash")?,
            salt: row.try_get("salt")?,
        })
    }

    pub async fn update_info(&self, tx: Tx<'_>, update: &UserUpdate) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, first_name = $4, last_name = $5, sex = $6, birth_date = $7
            WHERE id = $1
            "#,
        )
        .bind(update.id)
        .bind(&update.username)
        .bind(&update.email)
        .bind(update.first_name.trim())
        .bind(update.last_name.trim())
        .bind(update.sex.as_str())
        .bind(update.birth_date)
        .execute(&mut *conn)
        .await
        .map_err(map_unique)?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("user", update.id));
        }
        Ok(())
    }

    pub async fn update_avatar(&self, tx: Tx<'_>, id: i64, avatar_src: &str) -> Result<()> {
        let mut conn = acquire(&self.pool, tx).await?;
        let result = sqlx::query("UPDATE users SET avatar_src = $2 WHERE id = $1")
            .bind(id)
            .bind(avatar_src)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("user", id));
        }
        Ok(())
    }

    /// Replace the password and invalidate every outstanding session.
    /// Returns the new version.
    pub async fn update_password(&self, tx: Tx<'_>, id: i64, credentials: &Credentials) -> Result<i64> {
        let mut conn = acquire(&self.pool, tx).await?;
        let version: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET password_hash = $2, salt = $3, version = version + 1 WHERE id = $1 RETURNING version",
        )
        .bind(id)
        .bind(&credentials.password_hash)
        .bind(&credentials.salt)
        .fetch_optional(&mut *conn)
        .await?;

        version.ok_or_else(|| PlatformError::not_found("user", id))
    }

    /// Returns the new version.
    pub async fn increment_version(&self, tx: Tx<'_>, id: i64) -> Result<i64> {
        let mut conn = acquire(&self.pool, tx).await?;
        let version: Option<i64> =
            sqlx::query_scalar("UPDATE users SET version = version + 1 WHERE id = $1 RETURNING version")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        let version = version.ok_or_else(|| PlatformError::not_found("user", id))?;
        debug!(user_id = id, version, "Incremented user version");
        Ok(version)
    }

    /// Owners of a playlist, oldest first.
    pub async fn find_by_playlist(&self, tx: Tx<'_>, playlist_id: i64) -> Result<Vec<User>> {
        let mut conn = acquire(&self.pool, tx).await?;
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users u JOIN playlist_user pu ON pu.user_id = u.id WHERE pu.playlist_id = $1 ORDER BY u.id",
            USER_COLUMNS
        ))
        .bind(playlist_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}
