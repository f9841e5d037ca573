//! Read model implementations.

mod postgres;
mod store;

pub use postgres::PostgresReservationsView;
pub use store::StoreReservationsView;
