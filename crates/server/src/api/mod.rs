//! Domain-focused API endpoint modules.
//!
//! Each sub-module owns a single responsibility area.
//! Shared types, error helpers, and the request extractors live here.

mod beer;
mod containers;
mod health;
mod houses;
mod schedule;
mod tasks;
mod users;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use household_core::{HouseId, UserId};
use household_scheduler::ScheduleError;
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;
use crate::store::StoreError;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);
pub(crate) type ApiResult<T> = Result<T, ApiError>;

// ── Helpers ──────────────────────────────────────────────────────

fn error_response(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: msg.into() }))
}

pub(crate) fn bad_request(msg: impl Into<String>) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, msg)
}

pub(crate) fn unauthorized(msg: impl Into<String>) -> ApiError {
    error_response(StatusCode::UNAUTHORIZED, msg)
}

pub(crate) fn forbidden(msg: impl Into<String>) -> ApiError {
    error_response(StatusCode::FORBIDDEN, msg)
}

pub(crate) fn not_found(resource: &str, id: impl std::fmt::Display) -> ApiError {
    error_response(
        StatusCode::NOT_FOUND,
        format!("{} not found: {}", resource, id),
    )
}

pub(crate) fn conflict(msg: impl Into<String>) -> ApiError {
    error_response(StatusCode::CONFLICT, msg)
}

pub(crate) fn internal_error(e: impl std::fmt::Display) -> ApiError {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub(crate) fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound { resource, id } => not_found(resource, id),
        StoreError::Conflict(msg) => conflict(msg),
        StoreError::Invalid(e) => bad_request(e.to_string()),
        StoreError::Database(e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)) => {
            tracing::warn!(error = %e, "database unavailable");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
        StoreError::Database(e) => {
            tracing::error!(error = %e, "store failure");
            internal_error(e)
        }
    }
}

pub(crate) fn schedule_error(e: ScheduleError) -> ApiError {
    bad_request(e.to_string())
}

// ── Extractors ───────────────────────────────────────────────────
// axum's own extractors reject with plain text; these wrap them so every
// client error carries an `ErrorResponse` body.

/// JSON request body.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(error_response(rejection.status(), rejection.body_text())),
        }
    }
}

/// Query string parameters.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(error_response(rejection.status(), rejection.body_text())),
        }
    }
}

/// Path segments, e.g. ids that must parse as UUIDs.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(error_response(rejection.status(), rejection.body_text())),
        }
    }
}

// ── Acting user ──────────────────────────────────────────────────

/// Header carrying the authenticated user's id, set by the fronting auth layer.
pub const ACTING_USER_HEADER: &str = "x-user-id";

/// The user on whose behalf a request is made. Rejects with 401 when the
/// header is missing, malformed, or names an unknown user.
#[derive(Debug, Clone, Copy)]
pub struct ActingUser(pub UserId);

impl FromRequestParts<Arc<AppState>> for ActingUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTING_USER_HEADER)
            .ok_or_else(|| unauthorized(format!("missing {} header", ACTING_USER_HEADER)))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| unauthorized(format!("invalid {} header", ACTING_USER_HEADER)))?;

        match state.store.get_user(id).await {
            Ok(_) => Ok(ActingUser(id)),
            Err(StoreError::NotFound { .. }) => Err(unauthorized("unknown user")),
            Err(e) => Err(store_error(e)),
        }
    }
}

/// 403 unless `user` is an active member of `house`; 404 for an unknown house.
pub(crate) async fn require_member(state: &AppState, house: HouseId, user: UserId) -> ApiResult<()> {
    if state.store.is_member(house, user).await.map_err(store_error)? {
        return Ok(());
    }
    state.store.get_house(house).await.map_err(store_error)?;
    Err(forbidden("not a member of this house"))
}

// ── Re-exports ───────────────────────────────────────────────────
// Flat `api::foo` paths used by route registration.

pub use beer::{beer_action, beer_balances};
pub use containers::{advance_container, list_containers};
pub use health::health;
pub use houses::{
    add_member, create_house, get_house, house_tasks, list_houses, list_members, my_houses,
    remove_member, update_house,
};
pub use schedule::{house_schedule, task_schedule, user_schedule};
pub use tasks::{
    assign_task, create_task, delete_task, get_task, unassign_task, update_task, user_tasks,
};
pub use users::{create_user, get_user, update_user};

#[cfg(test)]
mod tests {
    use super::*;
    use household_core::HouseholdError;

    #[test]
    fn store_errors_map_to_status_codes() {
        let status = |e: StoreError| store_error(e).0;
        assert_eq!(status(StoreError::not_found("Task", 1)), StatusCode::NOT_FOUND);
        assert_eq!(status(StoreError::Conflict("taken".into())), StatusCode::CONFLICT);
        assert_eq!(
            status(StoreError::Invalid(HouseholdError::InvalidInterval(3_000_000_000))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(StoreError::Database(sqlx::Error::PoolTimedOut)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(StoreError::Database(sqlx::Error::RowNotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
