//! In-memory store implementations.
//!
//! State lives behind a `tokio::sync::RwLock`. Mutations hold the write lock
//! only for the duration of a single store call, never across a whole use
//! case, so unrelated bookings do not serialize on each other.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    EntityKind, IdentitySequence, InMemorySequence, Period, Reservation, ReservationId,
    ReservationLedger, Reservations, Result, StoreError, Subject, SubjectCatalog, SubjectId,
    Subjects, User, UserDirectory, UserId, normalize,
};

#[derive(Default)]
struct CatalogState {
    subjects: BTreeMap<SubjectId, Subject>,
    tags_by_subject: HashMap<SubjectId, BTreeSet<String>>,
    subjects_by_tag: HashMap<String, BTreeSet<SubjectId>>,
}

/// In-memory subject catalog with a tag → subjects index.
#[derive(Clone)]
pub struct InMemoryCatalog {
    sequence: Arc<dyn IdentitySequence>,
    state: Arc<RwLock<CatalogState>>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    /// Creates an empty catalog with its own identity sequence.
    pub fn new() -> Self {
        Self::with_sequence(Arc::new(InMemorySequence::new()))
    }

    /// Creates an empty catalog drawing identities from `sequence`.
    pub fn with_sequence(sequence: Arc<dyn IdentitySequence>) -> Self {
        Self {
            sequence,
            state: Arc::new(RwLock::new(CatalogState::default())),
        }
    }

    /// Returns the number of subjects stored.
    pub async fn subject_count(&self) -> usize {
        self.state.read().await.subjects.len()
    }
}

#[async_trait]
impl SubjectCatalog for InMemoryCatalog {
    async fn next_identity(&self) -> Result<SubjectId> {
        Ok(SubjectId::new(self.sequence.next().await?))
    }

    async fn add(&self, subject: Subject) -> Result<()> {
        let mut state = self.state.write().await;
        if state.subjects.contains_key(&subject.id) {
            return Err(StoreError::already_exists(EntityKind::Subject, subject.id));
        }
        state.subjects.insert(subject.id, subject);
        Ok(())
    }

    async fn get(&self, id: SubjectId) -> Result<Subject> {
        self.state
            .read()
            .await
            .subjects
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::Subject, id))
    }

    async fn get_by_name(&self, name: &str) -> Result<Subject> {
        let state = self.state.read().await;
        state
            .subjects
            .values()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| StoreError::NameNotFound {
                kind: EntityKind::Subject,
                name: name.to_string(),
            })
    }

    async fn remove(&self, id: SubjectId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.subjects.remove(&id).is_none() {
            return Err(StoreError::not_found(EntityKind::Subject, id));
        }
        let tags = state.tags_by_subject.remove(&id).unwrap_or_default();
        for tag in tags {
            if let Some(ids) = state.subjects_by_tag.get_mut(&tag) {
                ids.remove(&id);
                if ids.is_empty() {
                    state.subjects_by_tag.remove(&tag);
                }
            }
        }
        Ok(())
    }

    async fn list(&self) -> Result<Subjects> {
        Ok(self.state.read().await.subjects.values().cloned().collect())
    }

    async fn add_tag(&self, id: SubjectId, tag: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.subjects.contains_key(&id) {
            return Err(StoreError::not_found(EntityKind::Subject, id));
        }
        if !state
            .tags_by_subject
            .entry(id)
            .or_default()
            .insert(tag.to_string())
        {
            return Err(StoreError::DuplicateTag {
                subject_id: id,
                tag: tag.to_string(),
            });
        }
        state
            .subjects_by_tag
            .entry(tag.to_string())
            .or_default()
            .insert(id);
        Ok(())
    }

    async fn get_tags(&self, id: SubjectId) -> Result<Vec<String>> {
        let state = self.state.read().await;
        if !state.subjects.contains_key(&id) {
            return Err(StoreError::not_found(EntityKind::Subject, id));
        }
        Ok(state
            .tags_by_subject
            .get(&id)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_by_tags(&self, tags: &[String]) -> Result<Subjects> {
        let state = self.state.read().await;
        let requested: BTreeSet<&str> = tags.iter().map(String::as_str).collect();
        if requested.is_empty() {
            return Ok(state.subjects.values().cloned().collect());
        }

        // Start from the rarest tag so the intersection shrinks fastest.
        let mut sets: Vec<&BTreeSet<SubjectId>> = Vec::with_capacity(requested.len());
        for tag in &requested {
            match state.subjects_by_tag.get(*tag) {
                Some(ids) => sets.push(ids),
                None => return Ok(Subjects::default()),
            }
        }
        sets.sort_by_key(|ids| ids.len());

        let Some((first, rest)) = sets.split_first() else {
            return Ok(Subjects::default());
        };
        let matching: BTreeSet<SubjectId> = first
            .iter()
            .filter(|id| rest.iter().all(|ids| ids.contains(*id)))
            .copied()
            .collect();

        Ok(matching
            .iter()
            .filter_map(|id| state.subjects.get(id).cloned())
            .collect())
    }
}

/// In-memory reservation ledger.
#[derive(Clone)]
pub struct InMemoryLedger {
    sequence: Arc<dyn IdentitySequence>,
    reservations: Arc<RwLock<BTreeMap<ReservationId, Reservation>>>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// Creates an empty ledger with its own identity sequence.
    pub fn new() -> Self {
        Self::with_sequence(Arc::new(InMemorySequence::new()))
    }

    /// Creates an empty ledger drawing identities from `sequence`.
    pub fn with_sequence(sequence: Arc<dyn IdentitySequence>) -> Self {
        Self {
            sequence,
            reservations: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Returns the number of reservations stored.
    pub async fn reservation_count(&self) -> usize {
        self.reservations.read().await.len()
    }

    async fn select(&self, keep: impl Fn(&Reservation) -> bool + Send) -> Reservations {
        self.reservations
            .read()
            .await
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReservationLedger for InMemoryLedger {
    async fn next_identity(&self) -> Result<ReservationId> {
        Ok(ReservationId::new(self.sequence.next().await?))
    }

    async fn add(&self, reservation: Reservation) -> Result<()> {
        let reservation = Reservation::new(
            reservation.id,
            reservation.user_id,
            reservation.subject_id,
            reservation.start,
            reservation.end,
        );
        let period = reservation.period();
        if period.is_empty() {
            return Err(StoreError::InvalidPeriod {
                start: period.start,
                end: period.end,
            });
        }

        let mut reservations = self.reservations.write().await;
        if reservations.contains_key(&reservation.id) {
            return Err(StoreError::already_exists(
                EntityKind::Reservation,
                reservation.id,
            ));
        }
        let conflicts: Vec<ReservationId> = reservations
            .values()
            .filter(|r| r.subject_id == reservation.subject_id && r.period().overlaps(&period))
            .map(|r| r.id)
            .collect();
        if !conflicts.is_empty() {
            tracing::debug!(
                subject_id = %reservation.subject_id,
                conflicts = conflicts.len(),
                "overlapping reservation rejected"
            );
            return Err(StoreError::Conflict(conflicts));
        }

        reservations.insert(reservation.id, reservation);
        Ok(())
    }

    async fn get(&self, id: ReservationId) -> Result<Reservation> {
        self.reservations
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::Reservation, id))
    }

    async fn remove(&self, id: ReservationId) -> Result<()> {
        self.reservations
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(EntityKind::Reservation, id))
    }

    async fn list(&self) -> Result<Reservations> {
        Ok(self.select(|_| true).await)
    }

    async fn for_period(&self, period: Period) -> Result<Reservations> {
        let period = Period::new(period.start, period.end);
        if period.is_empty() {
            return Ok(Reservations::default());
        }
        Ok(self.select(|r| r.period().overlaps(&period)).await)
    }

    async fn held_after(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        t: DateTime<Utc>,
    ) -> Result<Reservations> {
        let t = normalize(t);
        Ok(self
            .select(|r| r.end > t)
            .await
            .for_user(user_id)
            .for_subject(subject_id))
    }
}

/// In-memory user directory.
#[derive(Clone)]
pub struct InMemoryUserDirectory {
    sequence: Arc<dyn IdentitySequence>,
    users: Arc<RwLock<BTreeMap<UserId, User>>>,
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            sequence: Arc::new(InMemorySequence::new()),
            users: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn next_identity(&self) -> Result<UserId> {
        Ok(UserId::new(self.sequence.next().await?))
    }

    async fn add(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::already_exists(EntityKind::User, user.id));
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn get(&self, id: UserId) -> Result<User> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::User, id))
    }
}
