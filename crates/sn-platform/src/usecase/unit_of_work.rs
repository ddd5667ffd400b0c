//! Unit of Work
//!
//! Use-cases open one transaction per operation here and thread it through
//! repositories as `Some(&mut *tx)`. Dropping the transaction without
//! `commit` rolls it back, so early returns and cancelled requests leave no
//! partial writes.

use sqlx::{PgPool, Postgres, Transaction};

use crate::shared::error::Result;

pub type PgTransaction = Transaction<'static, Postgres>;

#[derive(Clone)]
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Read-committed transaction.
    pub async fn begin(&self) -> Result<PgTransaction> {
        Ok(self.pool.begin().await?)
    }
}
