//! Router assembly for the entlock HTTP API.
//!
//! [`build_router`] wires all handler functions to their routes with
//! CORS and tracing middleware layers.

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router with all API routes.
///
/// Routes use axum 0.8 `/{param}` path syntax.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // User management
        .route("/users/register", post(handlers::users::register_user))
        .route("/users/{user_id}", delete(handlers::users::deregister_user))
        .route("/users", get(handlers::users::list_users))
        // Lock management
        .route(
            "/locks",
            get(handlers::locks::list_locks).post(handlers::locks::acquire_lock),
        )
        .route(
            "/locks/{entity_type}/{entity_id}",
            get(handlers::locks::describe_lock),
        )
        .route(
            "/locks/{entity_type}/{entity_id}/validate",
            post(handlers::locks::validate_lock),
        )
        .route(
            "/locks/{entity_type}/{entity_id}/release",
            post(handlers::locks::release_lock),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
