//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::api;
use crate::state::AppState;

/// `*` allows any origin; anything else must be a single valid origin.
pub fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            warn!("Invalid CORS_ORIGIN {:?}: {}, allowing any origin", origin, e);
            CorsLayer::permissive()
        }
    }
}

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .route("/health", get(api::health))
        // Users
        .route("/api/users", post(api::create_user))
        .route("/api/users/{id}", get(api::get_user).put(api::update_user))
        .route("/api/users/{id}/tasks", get(api::user_tasks))
        .route("/api/users/{id}/schedule", get(api::user_schedule))
        // Houses: /mine MUST precede /{id}
        .route("/api/houses", get(api::list_houses).post(api::create_house))
        .route("/api/houses/mine", get(api::my_houses))
        .route(
            "/api/houses/{id}",
            get(api::get_house).put(api::update_house),
        )
        .route(
            "/api/houses/{id}/members",
            get(api::list_members).post(api::add_member),
        )
        .route(
            "/api/houses/{id}/members/{user_id}",
            delete(api::remove_member),
        )
        .route("/api/houses/{id}/tasks", get(api::house_tasks))
        .route("/api/houses/{id}/schedule", get(api::house_schedule))
        .route("/api/houses/{id}/containers", get(api::list_containers))
        .route(
            "/api/houses/{id}/containers/advance",
            post(api::advance_container),
        )
        .route(
            "/api/houses/{id}/beer",
            get(api::beer_balances).post(api::beer_action),
        )
        // Tasks
        .route("/api/tasks", post(api::create_task))
        .route(
            "/api/tasks/{id}",
            get(api::get_task)
                .put(api::update_task)
                .delete(api::delete_task),
        )
        .route("/api/tasks/{id}/assignees", post(api::assign_task))
        .route(
            "/api/tasks/{id}/assignees/{user_id}",
            delete(api::unassign_task),
        )
        .route("/api/tasks/{id}/schedule", get(api::task_schedule))
        .layer(cors_layer(cors_origin))
        .with_state(state)
}
