//! hifz-sched library interface
//!
//! Exposes the router and state for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Process start time for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            startup_time: hifz_common::time::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health::health_routes())
        .merge(api::assessment::assessment_routes())
        .merge(api::fluency::fluency_routes())
        .merge(api::queue::queue_routes())
        .merge(api::session::session_routes())
        .merge(api::events::event_routes())
        .merge(api::user::user_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(
            api::correlation::correlation_middleware,
        ))
        .layer(CorsLayer::permissive())
}
