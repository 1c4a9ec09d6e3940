// src/lib.rs
use anyhow::Result;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use handlers::{
    create_booking, health_check, list_bookings, login_begin, login_finish, logout,
    metrics_handler, rate_limit, register_begin, register_finish, root_handler, track_http,
    unlock_door,
};

// Public exports (visible outside this module)
pub mod domain;
pub mod services;

// Internal-only exports (sibling access within this module)
mod app_state;
mod config;
mod handlers;
mod infrastructure;
mod session;

pub use app_state::{AppState, Backends};
pub use config::*;
pub use session::{Session, SessionManager, SESSION_COOKIE};

// Publicly expose the infrastructure creation functions
pub use infrastructure::{
    connect_with_retry, // ---
    create_memory_repository,
    create_memory_session_store,
    create_noop_metrics,
    create_postgres_repository,
    create_prom_metrics,
    create_session_store,
    create_webauthn,
    create_webauthn_verifier,
    MemoryRepository,
};

/// Build the production state from configuration.
///
/// Connects to Postgres (retrying, then migrating) and opens the configured
/// session store. Fails if any backend cannot be reached or configured.
pub async fn create_app_state(config: &AppConfig) -> Result<AppState> {
    // ---
    let metrics = match config.server.metrics {
        MetricsBackend::Prometheus => create_prom_metrics()?,
        MetricsBackend::Noop => create_noop_metrics()?,
    };

    let pool = connect_with_retry(&config.database).await?;
    let repository = create_postgres_repository(pool);

    let backends = Backends {
        metrics,
        credentials: repository.clone(),
        bookings: repository,
        sessions: create_session_store(&config.session.backend)?,
        verifier: create_webauthn_verifier(&config.webauthn)?,
    };

    Ok(AppState::new(config, backends))
}

/// Build the HTTP router around `state`.
///
/// Only the ceremony endpoints pass through the rate limiter.
pub fn create_router(state: AppState) -> Router {
    // ---
    let ceremonies = Router::new()
        .route("/register/begin", post(register_begin))
        .route("/register/finish", post(register_finish))
        .route("/login/begin", post(login_begin))
        .route("/login/finish", post(login_finish))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/logout", get(logout).post(logout))
        .route("/booking/create", post(create_booking))
        .route("/bookings", get(list_bookings))
        .route("/unlock", post(unlock_door))
        .merge(ceremonies)
        .route_layer(middleware::from_fn_with_state(state.clone(), track_http))
        .with_state(state)
}
