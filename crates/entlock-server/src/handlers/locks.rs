//! Lock management handlers.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use entlock_core::{EntityId, EntityType, LockToken};

use crate::concurrency::extract_user_id;
use crate::error::ApiError;
use crate::schema::locks::{
    AcquireLockRequest, AcquireLockResponse, DescribeLockResponse, ListLocksResponse,
    ReleaseLockResponse, TokenRequest, ValidateLockResponse,
};
use crate::state::AppState;

/// `POST /locks`
pub async fn acquire_lock(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: Result<Json<AcquireLockRequest>, JsonRejection>,
) -> Result<Json<AcquireLockResponse>, ApiError> {
    let Json(req) = req?;
    let user_id = extract_user_id(&headers)?;
    let entity_type = EntityType::new(req.entity_type)?;

    // A concurrent deregister of this user waits for the insert.
    let record = state
        .users
        .while_registered(&user_id, || {
            state.lock_manager.acquire(
                &entity_type,
                EntityId(req.entity_id),
                user_id,
                req.info.unwrap_or_default(),
            )
        })
        .ok_or_else(|| ApiError::UserRequired(format!("user {} is not registered", user_id)))??;

    state.users.touch(&user_id);
    Ok(Json(record.into()))
}

/// `POST /locks/{entity_type}/{entity_id}/validate`
pub async fn validate_lock(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
    req: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<ValidateLockResponse>, ApiError> {
    let Path((entity_type, entity_id)) = path?;
    let Json(req) = req?;
    let entity_type = EntityType::new(entity_type)?;
    let token = LockToken::parse(req.token)?;

    let record = state
        .lock_manager
        .validate(&token, &entity_type, EntityId(entity_id))?;

    state.users.touch(&record.holder);
    Ok(Json(ValidateLockResponse {
        valid: true,
        lock: record.info(),
    }))
}

/// `POST /locks/{entity_type}/{entity_id}/release`
pub async fn release_lock(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
    req: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<ReleaseLockResponse>, ApiError> {
    let Path((entity_type, entity_id)) = path?;
    let Json(req) = req?;
    let entity_type = EntityType::new(entity_type)?;
    let token = LockToken::parse(req.token)?;

    state
        .lock_manager
        .release(&token, &entity_type, EntityId(entity_id))?;

    Ok(Json(ReleaseLockResponse {
        released: true,
        entity_type: entity_type.to_string(),
        entity_id,
    }))
}

/// `GET /locks/{entity_type}/{entity_id}`
pub async fn describe_lock(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> Result<Json<DescribeLockResponse>, ApiError> {
    let Path((entity_type, entity_id)) = path?;
    let entity_type = EntityType::new(entity_type)?;
    let lock = state
        .lock_manager
        .describe(&entity_type, EntityId(entity_id))?;

    Ok(Json(DescribeLockResponse {
        locked: lock.is_some(),
        lock,
    }))
}

/// `GET /locks`
pub async fn list_locks(
    State(state): State<AppState>,
) -> Result<Json<ListLocksResponse>, ApiError> {
    let locks = state.lock_manager.list_active()?;
    Ok(Json(ListLocksResponse { locks }))
}
