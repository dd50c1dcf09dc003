pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::roster::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Team assignment
        .route("/api/v1/teams/assign", post(handlers::handle_assign))
        .route("/api/v1/teams/assign/csv", post(handlers::handle_assign_csv))
        // Roster table import/export
        .route("/api/v1/roster/import", post(handlers::handle_import))
        .route("/api/v1/roster/export", post(handlers::handle_export))
        .with_state(state)
}
