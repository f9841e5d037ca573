//! Identity sequences.
//!
//! A sequence hands out unique, strictly increasing integers. Stores own one
//! sequence per entity kind and never reuse a value, even after the entity
//! it identified has been removed.

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::Result;

/// Source of unique, increasing identities.
///
/// Concurrent callers always receive distinct values.
#[async_trait]
pub trait IdentitySequence: Send + Sync {
    /// Returns the next identity.
    ///
    /// Fails only when the backing storage is unavailable.
    async fn next(&self) -> Result<i64>;
}

/// Process-local counter behind a mutex.
#[derive(Debug, Default)]
pub struct InMemorySequence {
    value: Mutex<i64>,
}

impl InMemorySequence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentitySequence for InMemorySequence {
    async fn next(&self) -> Result<i64> {
        let mut value = self.value.lock().await;
        *value += 1;
        Ok(*value)
    }
}

/// Counter row in a PostgreSQL table, advanced with a single atomic
/// `UPDATE ... RETURNING`.
///
/// The table holds exactly one row with a `value` column. The row lock taken
/// by the update serializes callers across processes.
#[derive(Clone)]
pub struct PostgresSequence {
    pool: PgPool,
    table: &'static str,
}

impl PostgresSequence {
    pub fn new(pool: PgPool, table: &'static str) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl IdentitySequence for PostgresSequence {
    async fn next(&self) -> Result<i64> {
        let sql = format!("UPDATE {} SET value = value + 1 RETURNING value", self.table);
        let value: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(value)
    }
}
