use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    EntityKind, IdentitySequence, Period, PostgresSequence, Reservation, ReservationId,
    ReservationLedger, Reservations, Result, StoreError, Subject, SubjectCatalog, SubjectId,
    Subjects, User, UserDirectory, UserId, normalize,
};

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    tracing::info!("database migrations applied");
    Ok(())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// PostgreSQL-backed subject catalog.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
    sequence: PostgresSequence,
}

impl PostgresCatalog {
    /// Creates a catalog using the `subject_seq` counter table.
    pub fn new(pool: PgPool) -> Self {
        let sequence = PostgresSequence::new(pool.clone(), "subject_seq");
        Self { pool, sequence }
    }

    fn row_to_subject(row: PgRow) -> Result<Subject> {
        Ok(Subject {
            id: SubjectId::new(row.try_get("id")?),
            name: row.try_get("name")?,
        })
    }
}

#[async_trait]
impl SubjectCatalog for PostgresCatalog {
    async fn next_identity(&self) -> Result<SubjectId> {
        Ok(SubjectId::new(self.sequence.next().await?))
    }

    async fn add(&self, subject: Subject) -> Result<()> {
        sqlx::query("INSERT INTO subjects (id, name) VALUES ($1, $2)")
            .bind(subject.id.as_i64())
            .bind(&subject.name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return StoreError::already_exists(EntityKind::Subject, subject.id);
                }
                StoreError::Database(e)
            })?;
        Ok(())
    }

    async fn get(&self, id: SubjectId) -> Result<Subject> {
        let row = sqlx::query("SELECT id, name FROM subjects WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_subject(row),
            None => Err(StoreError::not_found(EntityKind::Subject, id)),
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Subject> {
        let row = sqlx::query("SELECT id, name FROM subjects WHERE name = $1 ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_subject(row),
            None => Err(StoreError::NameNotFound {
                kind: EntityKind::Subject,
                name: name.to_string(),
            }),
        }
    }

    async fn remove(&self, id: SubjectId) -> Result<()> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(EntityKind::Subject, id));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Subjects> {
        let rows = sqlx::query("SELECT id, name FROM subjects ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_subject).collect()
    }

    async fn add_tag(&self, id: SubjectId, tag: &str) -> Result<()> {
        sqlx::query("INSERT INTO subject_tags (subject_id, tag) VALUES ($1, $2)")
            .bind(id.as_i64())
            .bind(tag)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return StoreError::DuplicateTag {
                        subject_id: id,
                        tag: tag.to_string(),
                    };
                }
                if is_foreign_key_violation(&e) {
                    return StoreError::not_found(EntityKind::Subject, id);
                }
                StoreError::Database(e)
            })?;
        Ok(())
    }

    async fn get_tags(&self, id: SubjectId) -> Result<Vec<String>> {
        self.get(id).await?;

        let tags: Vec<String> =
            sqlx::query_scalar("SELECT tag FROM subject_tags WHERE subject_id = $1 ORDER BY tag")
                .bind(id.as_i64())
                .fetch_all(&self.pool)
                .await?;
        Ok(tags)
    }

    async fn get_by_tags(&self, tags: &[String]) -> Result<Subjects> {
        let requested: Vec<String> = tags
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if requested.is_empty() {
            return self.list().await;
        }

        // A subject matches when every requested tag has a row of its own.
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.name
            FROM subjects s
            JOIN subject_tags t ON t.subject_id = s.id
            WHERE t.tag = ANY($1)
            GROUP BY s.id, s.name
            HAVING COUNT(DISTINCT t.tag) = $2
            ORDER BY s.id ASC
            "#,
        )
        .bind(&requested)
        .bind(requested.len() as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_subject).collect()
    }
}

/// PostgreSQL-backed reservation ledger.
///
/// Timestamps are stored in `TIMESTAMPTZ(0)` columns. Values are truncated
/// to whole seconds before they are bound so the database never rounds them.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
    sequence: PostgresSequence,
}

impl PostgresLedger {
    /// Creates a ledger using the `reservation_seq` counter table.
    pub fn new(pool: PgPool) -> Self {
        let sequence = PostgresSequence::new(pool.clone(), "reservation_seq");
        Self { pool, sequence }
    }

    fn row_to_reservation(row: PgRow) -> Result<Reservation> {
        Ok(Reservation {
            id: ReservationId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            subject_id: SubjectId::new(row.try_get("subject_id")?),
            start: row.try_get::<DateTime<Utc>, _>("start_at")?,
            end: row.try_get::<DateTime<Utc>, _>("end_at")?,
        })
    }
}

#[async_trait]
impl ReservationLedger for PostgresLedger {
    async fn next_identity(&self) -> Result<ReservationId> {
        Ok(ReservationId::new(self.sequence.next().await?))
    }

    async fn add(&self, reservation: Reservation) -> Result<()> {
        let period = Period::new(reservation.start, reservation.end);
        if period.is_empty() {
            return Err(StoreError::InvalidPeriod {
                start: period.start,
                end: period.end,
            });
        }

        let mut tx = self.pool.begin().await?;

        // Serializes check-and-insert per subject until the transaction ends.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(reservation.subject_id.as_i64())
            .execute(&mut *tx)
            .await?;

        let conflicts: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM reservations
            WHERE subject_id = $1 AND start_at < $3 AND end_at > $2
            ORDER BY id ASC
            "#,
        )
        .bind(reservation.subject_id.as_i64())
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&mut *tx)
        .await?;

        if !conflicts.is_empty() {
            tracing::debug!(
                subject_id = %reservation.subject_id,
                conflicts = conflicts.len(),
                "overlapping reservation rejected"
            );
            return Err(StoreError::Conflict(
                conflicts.into_iter().map(ReservationId::new).collect(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO reservations (id, user_id, subject_id, start_at, end_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reservation.id.as_i64())
        .bind(reservation.user_id.as_i64())
        .bind(reservation.subject_id.as_i64())
        .bind(period.start)
        .bind(period.end)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return StoreError::already_exists(EntityKind::Reservation, reservation.id);
            }
            StoreError::Database(e)
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: ReservationId) -> Result<Reservation> {
        let row = sqlx::query(
            "SELECT id, user_id, subject_id, start_at, end_at FROM reservations WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_reservation(row),
            None => Err(StoreError::not_found(EntityKind::Reservation, id)),
        }
    }

    async fn remove(&self, id: ReservationId) -> Result<()> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(EntityKind::Reservation, id));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Reservations> {
        let rows = sqlx::query(
            "SELECT id, user_id, subject_id, start_at, end_at FROM reservations ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn for_period(&self, period: Period) -> Result<Reservations> {
        let period = Period::new(period.start, period.end);
        if period.is_empty() {
            return Ok(Reservations::default());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, subject_id, start_at, end_at
            FROM reservations
            WHERE start_at < $2 AND end_at > $1
            ORDER BY id ASC
            "#,
        )
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn held_after(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        t: DateTime<Utc>,
    ) -> Result<Reservations> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, subject_id, start_at, end_at
            FROM reservations
            WHERE user_id = $1 AND subject_id = $2 AND end_at > $3
            ORDER BY id ASC
            "#,
        )
        .bind(user_id.as_i64())
        .bind(subject_id.as_i64())
        .bind(normalize(t))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }
}

/// PostgreSQL-backed user directory.
#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
    sequence: PostgresSequence,
}

impl PostgresUserDirectory {
    /// Creates a directory using the `user_seq` counter table.
    pub fn new(pool: PgPool) -> Self {
        let sequence = PostgresSequence::new(pool.clone(), "user_seq");
        Self { pool, sequence }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn next_identity(&self) -> Result<UserId> {
        Ok(UserId::new(self.sequence.next().await?))
    }

    async fn add(&self, user: User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, name) VALUES ($1, $2)")
            .bind(user.id.as_i64())
            .bind(&user.name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return StoreError::already_exists(EntityKind::User, user.id);
                }
                StoreError::Database(e)
            })?;
        Ok(())
    }

    async fn get(&self, id: UserId) -> Result<User> {
        let row = sqlx::query("SELECT id, name FROM users WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(User {
                id: UserId::new(row.try_get("id")?),
                name: row.try_get("name")?,
            }),
            None => Err(StoreError::not_found(EntityKind::User, id)),
        }
    }
}
