use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, state::AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // System endpoints
        .route("/health", get(handlers::health_handler))
        // Pick endpoints
        .route("/api/picks", post(handlers::create_pick))
        .route(
            "/api/picks/:id",
            get(handlers::get_pick)
                .patch(handlers::update_pick)
                .delete(handlers::delete_pick),
        )
        .route("/api/picks/:id/dispute", post(handlers::dispute_pick))
        .route("/api/picks/:id/ledger", get(handlers::get_ledger_proof))
        // Creator endpoints
        .route("/api/creators/:id/stats", get(handlers::get_creator_stats))
        .route(
            "/api/creators/:id/transparency",
            get(handlers::get_transparency_score),
        )
        // Grading endpoints
        .route("/api/grading/run", post(handlers::run_grading))
        .with_state(state)
        .layer(cors)
}
