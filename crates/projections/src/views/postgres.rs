//! Reservations read model joined in SQL.

use std::collections::BTreeSet;

use async_trait::async_trait;
use booking_store::normalize;
use chrono::{DateTime, Utc};
use common::{ReservationId, SubjectId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::read_model::{ReservationReadModel, ReservationView};
use crate::{ProjectionError, Result};

const SELECT_VIEW: &str = r#"
    SELECT r.id, r.subject_id, s.name AS subject_name,
           r.user_id, u.name AS user_name, r.start_at, r.end_at
    FROM reservations r
    JOIN subjects s ON s.id = r.subject_id
    JOIN users u ON u.id = r.user_id
"#;

/// PostgreSQL read model over the `reservations`, `subjects` and `users`
/// tables.
///
/// The inner joins leave out reservations whose subject or user is gone.
#[derive(Clone)]
pub struct PostgresReservationsView {
    pool: PgPool,
}

impl PostgresReservationsView {
    /// Creates a new view with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_view(row: PgRow) -> Result<ReservationView> {
        Ok(ReservationView {
            id: ReservationId::new(row.try_get("id")?),
            subject_id: SubjectId::new(row.try_get("subject_id")?),
            subject_name: row.try_get("subject_name")?,
            user_id: UserId::new(row.try_get("user_id")?),
            user_name: row.try_get("user_name")?,
            start: row.try_get("start_at")?,
            end: row.try_get("end_at")?,
        })
    }
}

#[async_trait]
impl ReservationReadModel for PostgresReservationsView {
    async fn get(&self, id: ReservationId) -> Result<ReservationView> {
        let sql = format!("{SELECT_VIEW} WHERE r.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_view(row),
            None => Err(ProjectionError::NotFound(id)),
        }
    }

    async fn active(&self, at: DateTime<Utc>, tags: &[String]) -> Result<Vec<ReservationView>> {
        let at = normalize(at);
        let requested: Vec<String> = tags
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let rows = if requested.is_empty() {
            let sql = format!(
                "{SELECT_VIEW} WHERE r.start_at <= $1 AND r.end_at > $1 ORDER BY r.id ASC"
            );
            sqlx::query(&sql).bind(at).fetch_all(&self.pool).await?
        } else {
            let sql = format!(
                r#"{SELECT_VIEW}
                WHERE r.start_at <= $1 AND r.end_at > $1
                  AND r.subject_id IN (
                      SELECT subject_id FROM subject_tags
                      WHERE tag = ANY($2)
                      GROUP BY subject_id
                      HAVING COUNT(DISTINCT tag) = $3
                  )
                ORDER BY r.id ASC"#
            );
            sqlx::query(&sql)
                .bind(at)
                .bind(&requested)
                .bind(requested.len() as i64)
                .fetch_all(&self.pool)
                .await?
        };

        rows.into_iter().map(Self::row_to_view).collect()
    }
}
