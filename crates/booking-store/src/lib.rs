//! Storage layer of the booking engine.
//!
//! Three capability traits describe the stores the booking core talks to:
//! - [`SubjectCatalog`]: bookable subjects and their tag index
//! - [`ReservationLedger`]: the authoritative set of reservations
//! - [`UserDirectory`]: user existence and display names
//!
//! Each trait has an in-memory implementation (see [`memory`]) and a
//! PostgreSQL implementation (see [`postgres`]). Both normalize every
//! timestamp to whole seconds so they classify interval boundaries the same
//! way.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod sequence;
pub mod store;

pub use common::{ReservationId, SubjectId, UserId};
pub use error::{EntityKind, Result, StoreError};
pub use memory::{InMemoryCatalog, InMemoryLedger, InMemoryUserDirectory};
pub use model::{Period, Reservation, Reservations, Subject, Subjects, User, normalize};
pub use postgres::{PostgresCatalog, PostgresLedger, PostgresUserDirectory, run_migrations};
pub use sequence::{IdentitySequence, InMemorySequence, PostgresSequence};
pub use store::{ReservationLedger, ReservationLedgerExt, SubjectCatalog, UserDirectory};
