//! Reservations read model joined in process from the store traits.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use booking_store::{
    Period, Reservation, ReservationLedger, StoreError, SubjectCatalog, UserDirectory, normalize,
};
use chrono::{DateTime, Duration, Utc};
use common::ReservationId;

use crate::read_model::{ReservationReadModel, ReservationView};
use crate::{ProjectionError, Result};

/// Read model that joins ledger entries with catalog and user names.
///
/// Works over any backend; the in-memory stores use it directly.
#[derive(Clone)]
pub struct StoreReservationsView {
    catalog: Arc<dyn SubjectCatalog>,
    ledger: Arc<dyn ReservationLedger>,
    users: Arc<dyn UserDirectory>,
}

impl StoreReservationsView {
    /// Creates a view over the given stores.
    pub fn new(
        catalog: Arc<dyn SubjectCatalog>,
        ledger: Arc<dyn ReservationLedger>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            users,
        }
    }

    /// Joins one reservation, or `None` if its subject or user is missing.
    async fn join(&self, reservation: Reservation) -> Result<Option<ReservationView>> {
        let subject = match self.catalog.get(reservation.subject_id).await {
            Ok(subject) => subject,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let user = match self.users.get(reservation.user_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(ReservationView {
            id: reservation.id,
            subject_id: subject.id,
            subject_name: subject.name,
            user_id: user.id,
            user_name: user.name,
            start: reservation.start,
            end: reservation.end,
        }))
    }
}

#[async_trait]
impl ReservationReadModel for StoreReservationsView {
    async fn get(&self, id: ReservationId) -> Result<ReservationView> {
        let reservation = match self.ledger.get(id).await {
            Ok(reservation) => reservation,
            Err(StoreError::NotFound { .. }) => return Err(ProjectionError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };

        self.join(reservation)
            .await?
            .ok_or(ProjectionError::NotFound(id))
    }

    async fn active(&self, at: DateTime<Utc>, tags: &[String]) -> Result<Vec<ReservationView>> {
        // At second precision, overlapping [at, at + 1s) means active at `at`.
        let at = normalize(at);
        let running = self
            .ledger
            .for_period(Period::new(at, at + Duration::seconds(1)))
            .await?;

        let allowed = if tags.is_empty() {
            None
        } else {
            let subjects = self.catalog.get_by_tags(tags).await?;
            Some(subjects.ids().into_iter().collect::<HashSet<_>>())
        };

        let mut views = Vec::with_capacity(running.len());
        for reservation in running {
            if allowed
                .as_ref()
                .is_some_and(|allowed| !allowed.contains(&reservation.subject_id))
            {
                continue;
            }
            let id = reservation.id;
            match self.join(reservation).await? {
                Some(view) => views.push(view),
                None => tracing::debug!(reservation_id = %id, "Skipping orphaned reservation"),
            }
        }
        Ok(views)
    }
}
