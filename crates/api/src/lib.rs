//! HTTP front end with observability for the booking engine.
//!
//! Provides REST endpoints for users, the subject catalog and reservations,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use booking_store::{
    InMemoryCatalog, InMemoryLedger, InMemoryUserDirectory, PostgresCatalog, PostgresLedger,
    PostgresUserDirectory, ReservationLedger, StoreError, SubjectCatalog, UserDirectory,
    run_migrations,
};
use domain::{BookingService, CatalogService, Clock, SystemClock, UserService};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{PostgresReservationsView, ReservationReadModel, StoreReservationsView};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub booking: BookingService,
    pub catalog: CatalogService,
    pub users: UserService,
    /// Name of the storage backend, reported by `/health`.
    pub backend: &'static str,
}

impl AppState {
    fn assemble(
        catalog: Arc<dyn SubjectCatalog>,
        ledger: Arc<dyn ReservationLedger>,
        users: Arc<dyn UserDirectory>,
        read_model: Arc<dyn ReservationReadModel>,
        clock: Arc<dyn Clock>,
        backend: &'static str,
    ) -> Self {
        Self {
            booking: BookingService::new(
                catalog.clone(),
                ledger,
                users.clone(),
                read_model,
                clock,
            ),
            catalog: CatalogService::new(catalog),
            users: UserService::new(users),
            backend,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/users", post(routes::users::register))
        .route("/users/{id}", get(routes::users::get))
        .route(
            "/subjects",
            post(routes::subjects::create).get(routes::subjects::list),
        )
        .route(
            "/subjects/{id}",
            get(routes::subjects::get).delete(routes::subjects::remove),
        )
        .route(
            "/subjects/{id}/tags",
            get(routes::subjects::tags).post(routes::subjects::add_tags),
        )
        .route(
            "/reservations",
            post(routes::reservations::create).delete(routes::reservations::remove),
        )
        .route("/reservations/active", get(routes::reservations::active))
        .route("/reservations/{id}", get(routes::reservations::get))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over fresh in-memory stores and the wall clock.
pub fn create_memory_state() -> Arc<AppState> {
    create_memory_state_with_clock(Arc::new(SystemClock))
}

/// Creates application state over fresh in-memory stores and the given clock.
pub fn create_memory_state_with_clock(clock: Arc<dyn Clock>) -> Arc<AppState> {
    let catalog = Arc::new(InMemoryCatalog::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    let read_model = Arc::new(StoreReservationsView::new(
        catalog.clone(),
        ledger.clone(),
        users.clone(),
    ));

    Arc::new(AppState::assemble(
        catalog, ledger, users, read_model, clock, "memory",
    ))
}

/// Runs the migrations and creates application state over PostgreSQL.
pub async fn create_postgres_state(pool: PgPool) -> Result<Arc<AppState>, StoreError> {
    run_migrations(&pool).await?;

    Ok(Arc::new(AppState::assemble(
        Arc::new(PostgresCatalog::new(pool.clone())),
        Arc::new(PostgresLedger::new(pool.clone())),
        Arc::new(PostgresUserDirectory::new(pool.clone())),
        Arc::new(PostgresReservationsView::new(pool)),
        Arc::new(SystemClock),
        "postgres",
    )))
}
