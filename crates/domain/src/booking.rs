//! Reservation use cases.

use std::sync::Arc;
use std::time::Instant;

use booking_store::{
    Period, Reservation, ReservationLedger, ReservationLedgerExt, SubjectCatalog, UserDirectory,
    normalize,
};
use chrono::{DateTime, Duration, Utc};
use common::ReservationId;
use projections::{ReservationReadModel, ReservationView};

use crate::clock::Clock;
use crate::commands::{CreateReservation, RemoveReservations};
use crate::error::{BookingError, Result};

/// How far in the past a reservation may start, to tolerate clock skew when
/// booking "now".
const GRACE_PERIOD_SECONDS: i64 = 60;

/// Coordinates the stores, the read model and the clock for reservations.
///
/// The service holds no state of its own; clones share the same stores.
#[derive(Clone)]
pub struct BookingService {
    catalog: Arc<dyn SubjectCatalog>,
    ledger: Arc<dyn ReservationLedger>,
    users: Arc<dyn UserDirectory>,
    read_model: Arc<dyn ReservationReadModel>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    /// Creates a new booking service.
    pub fn new(
        catalog: Arc<dyn SubjectCatalog>,
        ledger: Arc<dyn ReservationLedger>,
        users: Arc<dyn UserDirectory>,
        read_model: Arc<dyn ReservationReadModel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            users,
            read_model,
            clock,
        }
    }

    /// Reserves a subject for a period.
    ///
    /// Fails with `NotFound` for an unknown user or subject, `PastReservation`
    /// when the start lies more than a minute before now, `InvalidPeriod` when
    /// the period is empty, and `AlreadyReserved` listing every overlapping
    /// reservation of the subject.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, cmd: CreateReservation) -> Result<Reservation> {
        let started = Instant::now();
        let result = self.try_create(&cmd).await;
        metrics::histogram!("booking_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(reservation) => {
                metrics::counter!("reservations_created_total").increment(1);
                tracing::info!(
                    reservation_id = %reservation.id,
                    subject_id = %reservation.subject_id,
                    user_id = %reservation.user_id,
                    "reservation created"
                );
            }
            Err(e) => {
                metrics::counter!("reservations_rejected_total", "reason" => e.reason())
                    .increment(1);
                if !e.is_infrastructure() {
                    tracing::debug!(error = %e, "reservation rejected");
                }
            }
        }
        result
    }

    async fn try_create(&self, cmd: &CreateReservation) -> Result<Reservation> {
        self.users.get(cmd.user_id).await?;
        self.catalog.get(cmd.subject_id).await?;

        let period = Period::new(cmd.start, cmd.end);
        let now = normalize(self.clock.now());
        if now > period.start + Duration::seconds(GRACE_PERIOD_SECONDS) {
            return Err(BookingError::PastReservation {
                start: period.start,
                now,
            });
        }
        if period.is_empty() {
            return Err(BookingError::InvalidPeriod {
                start: period.start,
                end: period.end,
            });
        }

        let conflicts = self.ledger.conflicts_with(cmd.subject_id, period).await?;
        if !conflicts.is_empty() {
            return Err(BookingError::AlreadyReserved {
                conflicting: conflicts.ids(),
            });
        }

        // The ledger repeats the overlap check atomically, so a booking racing
        // this one still ends in AlreadyReserved.
        let id = self.ledger.next_identity().await?;
        let reservation =
            Reservation::new(id, cmd.user_id, cmd.subject_id, period.start, period.end);
        self.ledger.add(reservation.clone()).await?;
        Ok(reservation)
    }

    /// Removes every current and future reservation the user holds on the
    /// subject and returns their ids.
    ///
    /// Fails with `NoActiveReservation` if there is nothing to remove.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, cmd: RemoveReservations) -> Result<Vec<ReservationId>> {
        let now = self.clock.now();
        let found = self
            .ledger
            .held_after(cmd.user_id, cmd.subject_id, now)
            .await?;

        if found.is_empty() {
            return Err(BookingError::NoActiveReservation {
                user_id: cmd.user_id,
                subject_id: cmd.subject_id,
            });
        }

        let mut removed = Vec::with_capacity(found.len());
        for reservation in found {
            match self.ledger.remove(reservation.id).await {
                Ok(()) => removed.push(reservation.id),
                // Removed concurrently by another request.
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        metrics::counter!("reservations_removed_total").increment(removed.len() as u64);
        tracing::info!(count = removed.len(), "reservations removed");
        Ok(removed)
    }

    /// Reservations active at `at`, optionally restricted to subjects carrying
    /// every one of `tags`.
    #[tracing::instrument(skip(self))]
    pub async fn active_reservations(
        &self,
        at: DateTime<Utc>,
        tags: &[String],
    ) -> Result<Vec<ReservationView>> {
        Ok(self.read_model.active(at, tags).await?)
    }

    /// Reservations active right now.
    pub async fn active_now(&self, tags: &[String]) -> Result<Vec<ReservationView>> {
        self.active_reservations(self.clock.now(), tags).await
    }

    /// Gets one reservation joined with its subject and user names.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ReservationId) -> Result<ReservationView> {
        Ok(self.read_model.get(id).await?)
    }

    /// The first still-existing reservation among `conflicting`, for reporting
    /// who blocks a booking and until when.
    pub async fn conflict_details(
        &self,
        conflicting: &[ReservationId],
    ) -> Result<Option<ReservationView>> {
        for id in conflicting {
            match self.read_model.get(*id).await {
                Ok(view) => return Ok(Some(view)),
                Err(projections::ProjectionError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}
