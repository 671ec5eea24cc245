//! Reviewer inbox handler

use crate::api::rest::identity::caller_from_headers;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use editorial_ledger::PendingReview;
use editorial_storage::QueryWindow;
use editorial_types::ReviewLevel;
use serde::Deserialize;

/// Inbox paging
#[derive(Debug, Deserialize)]
pub struct PendingReviewsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Open placeholders at `level`, oldest first
pub async fn pending_reviews(
    State(state): State<AppState>,
    Path(level): Path<String>,
    headers: HeaderMap,
    Query(query): Query<PendingReviewsQuery>,
) -> ApiResult<Json<Vec<PendingReview>>> {
    let caller = caller_from_headers(&state, &headers)?;
    let level = level
        .parse::<ReviewLevel>()
        .map_err(|_| ApiError::BadRequest(format!("unknown review level: {}", level)))?;
    let window = QueryWindow {
        limit: query.limit,
        offset: query.offset,
    };
    let pending = state
        .coordinator
        .pending_reviews(&caller, level, window)
        .await?;
    Ok(Json(pending))
}
