//! Behaviour every store backend must share.
//!
//! Each check takes a fresh [`Backend`]; the test files instantiate the
//! whole suite for one backend with [`contract_tests!`].

use std::collections::BTreeSet;
use std::sync::Arc;

use booking_store::{
    EntityKind, Period, Reservation, ReservationId, ReservationLedger, StoreError, Subject,
    SubjectCatalog, SubjectId, User, UserDirectory, UserId,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures_util::future::join_all;

/// The stores of one backend.
pub struct Backend {
    pub catalog: Arc<dyn SubjectCatalog>,
    pub ledger: Arc<dyn ReservationLedger>,
    pub users: Arc<dyn UserDirectory>,
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

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 20, h, m, s).unwrap()
}

async fn subjects_exist(catalog: &dyn SubjectCatalog, names: &[&str]) -> Vec<SubjectId> {
    let mut ids = Vec::new();
    for name in names {
        let id = catalog.next_identity().await.unwrap();
        catalog.add(Subject::new(id, *name)).await.unwrap();
        ids.push(id);
    }
    ids
}

async fn persist(
    ledger: &dyn ReservationLedger,
    subject: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Reservation {
    let id = ledger.next_identity().await.unwrap();
    let reservation = Reservation::new(id, UserId::new(1), SubjectId::new(subject), start, end);
    ledger.add(reservation.clone()).await.unwrap();
    reservation
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|t| t.to_string()).collect()
}

// Catalog

pub async fn missing_subject_is_not_found(backend: Backend) {
    let err = backend.catalog.get(SubjectId::new(1234)).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Subject,
            id: 1234
        }
    ));
}

pub async fn subject_round_trip(backend: Backend) {
    let subject = Subject::new(SubjectId::new(1), "Test subject");
    backend.catalog.add(subject.clone()).await.unwrap();

    assert_eq!(backend.catalog.get(subject.id).await.unwrap(), subject);
}

pub async fn subject_id_cannot_be_reused(backend: Backend) {
    let subject = Subject::new(SubjectId::new(1), "first");
    backend.catalog.add(subject).await.unwrap();

    let err = backend
        .catalog
        .add(Subject::new(SubjectId::new(1), "second"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::AlreadyExists {
            kind: EntityKind::Subject,
            ..
        }
    ));
}

pub async fn subject_found_by_name(backend: Backend) {
    let ids = subjects_exist(&*backend.catalog, &["first", "second", "third"]).await;

    let found = backend.catalog.get_by_name("second").await.unwrap();
    assert_eq!(found.id, ids[1]);

    let err = backend
        .catalog
        .get_by_name("does not exist")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

pub async fn removed_subject_is_gone(backend: Backend) {
    let ids = subjects_exist(&*backend.catalog, &["Test Subject"]).await;
    backend.catalog.add_tag(ids[0], "quiet").await.unwrap();

    backend.catalog.remove(ids[0]).await.unwrap();

    assert!(backend.catalog.get(ids[0]).await.unwrap_err().is_not_found());
    assert!(backend.catalog.remove(ids[0]).await.unwrap_err().is_not_found());
    assert!(
        backend
            .catalog
            .get_by_tags(&tags(&["quiet"]))
            .await
            .unwrap()
            .is_empty()
    );
}

pub async fn subjects_listed_by_id(backend: Backend) {
    let ids = subjects_exist(&*backend.catalog, &["Subject 1", "Subject 2", "Subject 3"]).await;

    let subjects = backend.catalog.list().await.unwrap();
    assert_eq!(subjects.ids(), ids);
    let names: Vec<_> = subjects.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Subject 1", "Subject 2", "Subject 3"]);
}

pub async fn tags_intersect_exactly(backend: Backend) {
    let ids = subjects_exist(
        &*backend.catalog,
        &[
            "Conference room #1",
            "Conference room #2",
            "Conference room #3",
            "Conference room #4",
        ],
    )
    .await;
    backend.catalog.add_tag(ids[1], "spacious").await.unwrap();
    backend.catalog.add_tag(ids[3], "spacious").await.unwrap();
    backend.catalog.add_tag(ids[3], "soundproof").await.unwrap();

    let spacious = backend
        .catalog
        .get_by_tags(&tags(&["spacious"]))
        .await
        .unwrap();
    assert_eq!(spacious.ids(), vec![ids[1], ids[3]]);

    let both = backend
        .catalog
        .get_by_tags(&tags(&["spacious", "soundproof"]))
        .await
        .unwrap();
    assert_eq!(both.ids(), vec![ids[3]]);
}

pub async fn tag_prefix_does_not_match(backend: Backend) {
    let ids = subjects_exist(&*backend.catalog, &["a", "b"]).await;
    backend.catalog.add_tag(ids[0], "testing").await.unwrap();
    backend.catalog.add_tag(ids[1], "test").await.unwrap();

    let found = backend
        .catalog
        .get_by_tags(&tags(&["test"]))
        .await
        .unwrap();
    assert_eq!(found.ids(), vec![ids[1]]);
}

pub async fn larger_tag_sets_narrow_results(backend: Backend) {
    let ids = subjects_exist(&*backend.catalog, &["a", "b", "c", "d"]).await;
    let assignments: [(usize, &[&str]); 4] = [
        (0, &["x"]),
        (1, &["x", "y"]),
        (2, &["x", "y", "z"]),
        (3, &["y", "z"]),
    ];
    for (index, subject_tags) in assignments {
        for tag in subject_tags {
            backend.catalog.add_tag(ids[index], tag).await.unwrap();
        }
    }

    let chain = [
        tags(&[]),
        tags(&["x"]),
        tags(&["x", "y"]),
        tags(&["x", "y", "z"]),
    ];
    let mut previous: Option<BTreeSet<SubjectId>> = None;
    for requested in &chain {
        let found: BTreeSet<SubjectId> = backend
            .catalog
            .get_by_tags(requested)
            .await
            .unwrap()
            .ids()
            .into_iter()
            .collect();
        if let Some(previous) = &previous {
            assert!(found.is_subset(previous), "{requested:?} widened the result");
        }
        previous = Some(found);
    }
    assert_eq!(previous, Some(BTreeSet::from([ids[2]])));
}

pub async fn empty_tag_set_matches_every_subject(backend: Backend) {
    let ids = subjects_exist(&*backend.catalog, &["a", "b"]).await;

    let found = backend.catalog.get_by_tags(&[]).await.unwrap();
    assert_eq!(found.ids(), ids);
}

pub async fn duplicate_tag_is_rejected(backend: Backend) {
    let ids = subjects_exist(&*backend.catalog, &["Test Subject"]).await;
    backend.catalog.add_tag(ids[0], "Test").await.unwrap();

    let err = backend.catalog.add_tag(ids[0], "Test").await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateTag { subject_id, .. } if subject_id == ids[0]));
}

pub async fn tagging_missing_subject_is_not_found(backend: Backend) {
    let err = backend
        .catalog
        .add_tag(SubjectId::new(77), "quiet")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

pub async fn tags_listed_alphabetically(backend: Backend) {
    let ids = subjects_exist(&*backend.catalog, &["Test"]).await;
    for tag in ["tag 3", "tag 1", "tag 2"] {
        backend.catalog.add_tag(ids[0], tag).await.unwrap();
    }

    assert_eq!(
        backend.catalog.get_tags(ids[0]).await.unwrap(),
        tags(&["tag 1", "tag 2", "tag 3"])
    );
    assert!(
        backend
            .catalog
            .get_tags(SubjectId::new(999))
            .await
            .unwrap_err()
            .is_not_found()
    );
}

pub async fn concurrent_subject_identities_are_distinct(backend: Backend) {
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let catalog = backend.catalog.clone();
            tokio::spawn(async move { catalog.next_identity().await.unwrap() })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

// Ledger

pub async fn missing_reservation_is_not_found(backend: Backend) {
    let err = backend
        .ledger
        .get(ReservationId::new(1234567))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Reservation,
            ..
        }
    ));
}

pub async fn reservation_round_trip(backend: Backend) {
    let reservation = persist(&*backend.ledger, 1, at(14, 0, 0), at(16, 0, 0)).await;

    assert_eq!(backend.ledger.get(reservation.id).await.unwrap(), reservation);

    backend.ledger.remove(reservation.id).await.unwrap();
    assert!(
        backend
            .ledger
            .get(reservation.id)
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        backend
            .ledger
            .remove(reservation.id)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

pub async fn subsecond_timestamps_are_truncated(backend: Backend) {
    let id = backend.ledger.next_identity().await.unwrap();
    let reservation = Reservation {
        id,
        user_id: UserId::new(1),
        subject_id: SubjectId::new(1),
        start: at(14, 0, 0) + Duration::milliseconds(600),
        end: at(15, 0, 0) + Duration::milliseconds(900),
    };
    backend.ledger.add(reservation).await.unwrap();

    let stored = backend.ledger.get(id).await.unwrap();
    assert_eq!(stored.start, at(14, 0, 0));
    assert_eq!(stored.end, at(15, 0, 0));
}

pub async fn reservations_for_period(backend: Backend) {
    let from = at(14, 0, 0);
    let to = at(15, 0, 0);
    let ledger = &*backend.ledger;
    let second = Duration::seconds(1);

    // Outside the window.
    persist(ledger, 1, from - Duration::hours(2), from - second).await;
    persist(ledger, 2, from - Duration::hours(4), from - Duration::hours(1)).await;
    persist(ledger, 3, from - Duration::hours(1), from).await;
    persist(ledger, 4, to, to + Duration::hours(1)).await;
    persist(ledger, 5, to + second, to + Duration::hours(1)).await;

    let expected = vec![
        persist(ledger, 6, from - Duration::hours(2), from + second).await,
        persist(ledger, 7, from, to).await,
        persist(ledger, 8, from + second, to - second).await,
        persist(ledger, 9, to - second, to + Duration::minutes(20)).await,
        persist(ledger, 10, from - Duration::hours(1), to + Duration::hours(1)).await,
    ];

    let found = ledger.for_period(Period::new(from, to)).await.unwrap();
    assert_eq!(found.into_vec(), expected);
}

pub async fn empty_period_matches_nothing(backend: Backend) {
    persist(&*backend.ledger, 1, at(13, 0, 0), at(16, 0, 0)).await;

    let empty = Period::new(at(14, 0, 0), at(14, 0, 0));
    let inverted = Period::new(at(15, 0, 0), at(14, 0, 0));
    assert!(backend.ledger.for_period(empty).await.unwrap().is_empty());
    assert!(backend.ledger.for_period(inverted).await.unwrap().is_empty());
}

pub async fn overlapping_add_reports_every_conflict(backend: Backend) {
    let first = persist(&*backend.ledger, 1, at(12, 0, 0), at(12, 30, 0)).await;
    let second = persist(&*backend.ledger, 1, at(12, 30, 0), at(13, 0, 0)).await;
    persist(&*backend.ledger, 2, at(12, 0, 0), at(13, 0, 0)).await;

    let id = backend.ledger.next_identity().await.unwrap();
    let clash = Reservation::new(
        id,
        UserId::new(2),
        SubjectId::new(1),
        at(12, 10, 0),
        at(12, 40, 0),
    );
    let err = backend.ledger.add(clash).await.unwrap_err();
    assert!(matches!(&err, StoreError::Conflict(ids) if *ids == vec![first.id, second.id]));
    assert!(backend.ledger.get(id).await.unwrap_err().is_not_found());
}

pub async fn adjacent_reservations_both_fit(backend: Backend) {
    persist(&*backend.ledger, 1, at(12, 0, 0), at(12, 30, 0)).await;
    persist(&*backend.ledger, 1, at(12, 30, 0), at(13, 0, 0)).await;
    persist(&*backend.ledger, 1, at(11, 0, 0), at(12, 0, 0)).await;

    assert_eq!(backend.ledger.list().await.unwrap().len(), 3);
}

pub async fn inverted_period_is_rejected(backend: Backend) {
    let id = backend.ledger.next_identity().await.unwrap();
    let reservation = Reservation::new(
        id,
        UserId::new(1),
        SubjectId::new(1),
        at(13, 0, 0),
        at(13, 0, 0) + Duration::milliseconds(500),
    );

    let err = backend.ledger.add(reservation).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidPeriod { .. }));
}

pub async fn reservations_listed_by_id(backend: Backend) {
    let a = persist(&*backend.ledger, 3, at(16, 0, 0), at(17, 0, 0)).await;
    let b = persist(&*backend.ledger, 1, at(9, 0, 0), at(10, 0, 0)).await;
    let c = persist(&*backend.ledger, 2, at(12, 0, 0), at(13, 0, 0)).await;

    assert_eq!(backend.ledger.list().await.unwrap().ids(), vec![a.id, b.id, c.id]);
}

pub async fn reservations_held_after(backend: Backend) {
    let ledger = &*backend.ledger;
    persist(ledger, 1, at(9, 0, 0), at(12, 0, 0)).await;
    let running = persist(ledger, 1, at(12, 0, 0), at(13, 0, 0)).await;
    let later = persist(ledger, 1, at(18, 0, 0), at(19, 0, 0)).await;
    persist(ledger, 2, at(14, 0, 0), at(15, 0, 0)).await;

    let id = ledger.next_identity().await.unwrap();
    let other_user = Reservation::new(
        id,
        UserId::new(2),
        SubjectId::new(1),
        at(20, 0, 0),
        at(21, 0, 0),
    );
    ledger.add(other_user).await.unwrap();

    let found = ledger
        .held_after(UserId::new(1), SubjectId::new(1), at(12, 0, 0))
        .await
        .unwrap();
    assert_eq!(found.ids(), vec![running.id, later.id]);
}

pub async fn concurrent_reservation_identities_are_distinct(backend: Backend) {
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let ledger = backend.ledger.clone();
            tokio::spawn(async move { ledger.next_identity().await.unwrap() })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

pub async fn concurrent_overlapping_adds_admit_one(backend: Backend) {
    let attempts = (1..=8).map(|user| {
        let ledger = backend.ledger.clone();
        async move {
            let id = ledger.next_identity().await.unwrap();
            let reservation = Reservation::new(
                id,
                UserId::new(user),
                SubjectId::new(1),
                at(12, 0, 0),
                at(13, 0, 0),
            );
            ledger.add(reservation).await
        }
    });

    let mut admitted = 0;
    for outcome in join_all(attempts).await {
        match outcome {
            Ok(()) => admitted += 1,
            Err(StoreError::Conflict(ids)) => assert_eq!(ids.len(), 1),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(backend.ledger.list().await.unwrap().len(), 1);
}

// Users

pub async fn user_round_trip(backend: Backend) {
    let id = backend.users.next_identity().await.unwrap();
    backend.users.add(User::new(id, "Alice")).await.unwrap();

    assert_eq!(backend.users.get(id).await.unwrap(), User::new(id, "Alice"));
    assert!(
        backend
            .users
            .get(UserId::new(999))
            .await
            .unwrap_err()
            .is_not_found()
    );

    let err = backend.users.add(User::new(id, "Bob")).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::AlreadyExists {
            kind: EntityKind::User,
            ..
        }
    ));
}
