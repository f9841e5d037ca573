//! Behaviour every reservation read model must share.

use std::sync::Arc;

use booking_store::{
    Reservation, ReservationLedger, Subject, SubjectCatalog, SubjectId, User, UserDirectory,
    UserId,
};
use chrono::{DateTime, TimeZone, Utc};
use common::ReservationId;
use projections::{ProjectionError, ReservationReadModel};

/// Stores of one backend plus the read model joined over them.
pub struct Backend {
    pub catalog: Arc<dyn SubjectCatalog>,
    pub ledger: Arc<dyn ReservationLedger>,
    pub users: Arc<dyn UserDirectory>,
    pub read_model: Arc<dyn ReservationReadModel>,
}

/// Generates one `#[tokio::test]` per contract check for a backend factory.
macro_rules! contract_tests {
    ($backend:path => $($name:ident),+ $(,)?) => {
        $(
            #[tokio::test]
            async fn $name() {
                contract::$name($backend().await).await;
            }
        )+
    };
    (#[ignore = $reason:literal] $backend:path => $($name:ident),+ $(,)?) => {
        $(
            #[tokio::test]
            #[ignore = $reason]
            async fn $name() {
                contract::$name($backend().await).await;
            }
        )+
    };
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 20, h, m, 0).unwrap()
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|t| t.to_string()).collect()
}

/// Subjects #1..#4 named "Subject #n", users Alice (#1) and Bob (#2).
async fn seed(backend: &Backend) {
    for n in 1..=4 {
        backend
            .catalog
            .add(Subject::new(SubjectId::new(n), format!("Subject #{n}")))
            .await
            .unwrap();
    }
    backend
        .users
        .add(User::new(UserId::new(1), "Alice"))
        .await
        .unwrap();
    backend
        .users
        .add(User::new(UserId::new(2), "Bob"))
        .await
        .unwrap();
}

async fn book(
    backend: &Backend,
    id: i64,
    user: i64,
    subject: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) {
    backend
        .ledger
        .add(Reservation::new(
            ReservationId::new(id),
            UserId::new(user),
            SubjectId::new(subject),
            start,
            end,
        ))
        .await
        .unwrap();
}

pub async fn active_reservations_are_joined(backend: Backend) {
    seed(&backend).await;
    book(&backend, 1, 1, 1, at(14, 0), at(14, 5)).await;
    book(&backend, 2, 2, 3, at(14, 0), at(14, 10)).await;
    book(&backend, 3, 2, 2, at(15, 0), at(16, 0)).await;

    let active = backend.read_model.active(at(14, 0), &[]).await.unwrap();

    assert_eq!(active.len(), 2);
    assert_eq!(active[0].id, ReservationId::new(1));
    assert_eq!(active[0].subject_name, "Subject #1");
    assert_eq!(active[0].user_name, "Alice");
    assert_eq!(active[0].start, at(14, 0));
    assert_eq!(active[0].end, at(14, 5));
    assert_eq!(active[1].id, ReservationId::new(2));
    assert_eq!(active[1].subject_name, "Subject #3");
    assert_eq!(active[1].user_name, "Bob");
    assert_eq!(active[1].end, at(14, 10));
}

pub async fn active_window_is_half_open(backend: Backend) {
    seed(&backend).await;
    book(&backend, 1, 1, 1, at(14, 0), at(14, 5)).await;

    assert!(backend.read_model.active(at(13, 59), &[]).await.unwrap().is_empty());
    assert_eq!(backend.read_model.active(at(14, 4), &[]).await.unwrap().len(), 1);
    assert!(backend.read_model.active(at(14, 5), &[]).await.unwrap().is_empty());
}

pub async fn active_filters_by_every_tag(backend: Backend) {
    seed(&backend).await;
    let catalog = &backend.catalog;
    catalog.add_tag(SubjectId::new(2), "spacious").await.unwrap();
    catalog.add_tag(SubjectId::new(4), "spacious").await.unwrap();
    catalog.add_tag(SubjectId::new(4), "soundproof").await.unwrap();
    for subject in 1..=4 {
        book(&backend, subject, 1, subject, at(9, 0), at(18, 0)).await;
    }

    let spacious = backend
        .read_model
        .active(at(12, 0), &tags(&["spacious"]))
        .await
        .unwrap();
    let ids: Vec<_> = spacious.iter().map(|v| v.subject_id).collect();
    assert_eq!(ids, vec![SubjectId::new(2), SubjectId::new(4)]);

    let both = backend
        .read_model
        .active(at(12, 0), &tags(&["spacious", "soundproof"]))
        .await
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].subject_name, "Subject #4");

    let none = backend
        .read_model
        .active(at(12, 0), &tags(&["spa"]))
        .await
        .unwrap();
    assert!(none.is_empty());
}

pub async fn orphaned_reservations_are_skipped(backend: Backend) {
    seed(&backend).await;
    book(&backend, 1, 1, 1, at(14, 0), at(15, 0)).await;
    book(&backend, 2, 1, 2, at(14, 0), at(15, 0)).await;
    book(&backend, 3, 9, 3, at(14, 0), at(15, 0)).await;

    backend.catalog.remove(SubjectId::new(2)).await.unwrap();

    let active = backend.read_model.active(at(14, 30), &[]).await.unwrap();
    assert_eq!(
        active.iter().map(|v| v.id).collect::<Vec<_>>(),
        vec![ReservationId::new(1)]
    );
    assert!(matches!(
        backend.read_model.get(ReservationId::new(2)).await,
        Err(ProjectionError::NotFound(_))
    ));
}

pub async fn get_joins_one_reservation(backend: Backend) {
    seed(&backend).await;
    book(&backend, 7, 2, 4, at(10, 0), at(11, 0)).await;

    let view = backend.read_model.get(ReservationId::new(7)).await.unwrap();
    assert_eq!(view.subject_id, SubjectId::new(4));
    assert_eq!(view.subject_name, "Subject #4");
    assert_eq!(view.user_id, UserId::new(2));
    assert_eq!(view.user_name, "Bob");
    assert_eq!((view.start, view.end), (at(10, 0), at(11, 0)));

    assert!(matches!(
        backend.read_model.get(ReservationId::new(8)).await,
        Err(ProjectionError::NotFound(id)) if id == ReservationId::new(8)
    ));
}

pub async fn view_serializes_for_display(backend: Backend) {
    seed(&backend).await;
    book(&backend, 1, 1, 1, at(14, 0), at(14, 5)).await;

    let view = backend.read_model.get(ReservationId::new(1)).await.unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["subject_name"], "Subject #1");
    assert_eq!(json["user_name"], "Alice");
    assert_eq!(json["id"], 1);
}
