//! Booking use cases.
//!
//! This crate coordinates the stores and the read model:
//! - [`BookingService`] creates, removes and queries reservations
//! - [`CatalogService`] manages subjects and their tags
//! - [`UserService`] registers and looks up users
//! - [`Clock`] supplies the current instant, so time can be simulated in tests

pub mod booking;
pub mod catalog;
pub mod clock;
pub mod commands;
pub mod error;
pub mod users;

pub use booking::BookingService;
pub use catalog::CatalogService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::{CreateReservation, CreateSubject, RegisterUser, RemoveReservations};
pub use error::{BookingError, Result};
pub use users::UserService;
