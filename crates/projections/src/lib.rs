//! Display-ready views of the booking stores.
//!
//! This crate provides the query side of the booking engine:
//! - [`ReservationReadModel`] trait for joined reservation lookups
//! - [`ReservationView`], a reservation with its subject and user names
//! - [`StoreReservationsView`], joining any set of store backends in process
//! - [`PostgresReservationsView`], joining in SQL

pub mod error;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use read_model::{ReservationReadModel, ReservationView};
pub use views::{PostgresReservationsView, StoreReservationsView};
