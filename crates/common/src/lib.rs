//! Identity types shared by every crate of the booking engine.

mod types;

pub use types::{ReservationId, SubjectId, UserId};
