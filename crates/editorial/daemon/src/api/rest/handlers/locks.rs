//! Edit lock session handlers

use crate::api::rest::identity::caller_from_headers;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use editorial_coordinator::EditGrant;
use editorial_types::{ArticleId, EditLock, EditorialError, LockStatus};
use serde::Serialize;

/// Release response
#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub released: bool,
}

/// Start an edit session. A live lock held by someone else is a 423.
pub async fn acquire_lock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<EditGrant>> {
    let caller = caller_from_headers(&state, &headers)?;
    let article_id = ArticleId::new(id);
    match state.coordinator.request_edit(&article_id, &caller).await? {
        EditGrant::Denied { holder, expires_at } => Err(EditorialError::LockConflict {
            article_id,
            holder,
            expires_at,
        }
        .into()),
        grant => Ok(Json(grant)),
    }
}

/// Heartbeat: extend the caller's lease
pub async fn renew_lock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<EditLock>> {
    let caller = caller_from_headers(&state, &headers)?;
    let lock = state
        .coordinator
        .renew_edit(&ArticleId::new(id), &caller)
        .await?;
    Ok(Json(lock))
}

/// End the caller's edit session. Succeeds for non-holders too.
pub async fn release_lock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<ReleaseResponse>> {
    let caller = caller_from_headers(&state, &headers)?;
    let released = state
        .coordinator
        .end_edit_session(&ArticleId::new(id), &caller)
        .await?;
    Ok(Json(ReleaseResponse { released }))
}

pub async fn lock_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<LockStatus>> {
    let caller = caller_from_headers(&state, &headers)?;
    let status = state
        .coordinator
        .lock_status(&ArticleId::new(id), &caller)
        .await?;
    Ok(Json(status))
}
