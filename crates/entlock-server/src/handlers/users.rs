//! User registration and lifecycle handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use entlock_core::UserId;

use crate::error::ApiError;
use crate::schema::users::{
    DeregisterUserResponse, ListUsersResponse, RegisterUserRequest, UserView,
};
use crate::state::AppState;

/// `POST /users/register`
pub async fn register_user(
    State(state): State<AppState>,
    req: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<Json<UserView>, ApiError> {
    let Json(req) = req?;
    let session = state.users.register(req.name);
    Ok(Json(session.into()))
}

/// `DELETE /users/{user_id}`
///
/// Also releases every lock the user holds.
pub async fn deregister_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DeregisterUserResponse>, ApiError> {
    let parsed = Uuid::parse_str(&user_id).map_err(|_| {
        ApiError::BadRequest(format!("invalid user id '{}': expected UUID", user_id))
    })?;
    let user_id = UserId(parsed);

    if !state.users.deregister(&user_id) {
        return Err(ApiError::NotFound(format!("user {} not found", parsed)));
    }

    let released_locks = state.lock_manager.release_all_for(&user_id)?;
    Ok(Json(DeregisterUserResponse {
        success: true,
        released_locks,
    }))
}

/// `GET /users`
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ListUsersResponse>, ApiError> {
    let mut users = state
        .users
        .list()
        .into_iter()
        .map(UserView::from)
        .collect::<Vec<_>>();
    users.sort_by_key(|u| (u.registered_at, u.user_id));

    Ok(Json(ListUsersResponse { users }))
}
