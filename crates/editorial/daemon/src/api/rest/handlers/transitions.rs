//! Workflow transition handlers
//!
//! Every transition takes an optional `{ "comment": ... }` body. Comments
//! are stored on the ledger row for approve and reject. An empty body means
//! no comment; a body that is present but malformed is a 400.

use crate::api::rest::identity::caller_from_headers;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use editorial_types::{Article, ArticleId, ReviewDecision, WorkflowAction};
use serde::Deserialize;

/// Optional transition body
#[derive(Debug, Default, Deserialize)]
pub struct TransitionRequest {
    #[serde(default)]
    pub comment: Option<String>,
}

/// Reviewer decision body
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub comment: Option<String>,
}

impl TransitionRequest {
    fn from_body(body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("invalid transition body: {e}")))
    }
}

async fn run_transition(
    state: AppState,
    id: String,
    headers: HeaderMap,
    action: WorkflowAction,
    body: Bytes,
) -> ApiResult<Json<Article>> {
    let caller = caller_from_headers(&state, &headers)?;
    let comment = TransitionRequest::from_body(&body)?.comment;
    let article = state
        .coordinator
        .transition(&ArticleId::new(id), &caller, action, comment)
        .await?;
    Ok(Json(article))
}

pub async fn submit_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Article>> {
    run_transition(state, id, headers, WorkflowAction::Submit, body).await
}

pub async fn approve_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Article>> {
    run_transition(state, id, headers, WorkflowAction::Approve, body).await
}

pub async fn reject_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Article>> {
    run_transition(state, id, headers, WorkflowAction::Reject, body).await
}

pub async fn publish_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Article>> {
    run_transition(state, id, headers, WorkflowAction::Publish, body).await
}

pub async fn unpublish_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Article>> {
    run_transition(state, id, headers, WorkflowAction::Unpublish, body).await
}

pub async fn reopen_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Article>> {
    run_transition(state, id, headers, WorkflowAction::Reopen, body).await
}

/// Record an `APPROVED` or `REJECTED` decision at the current stage
pub async fn submit_decision(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<Article>> {
    let caller = caller_from_headers(&state, &headers)?;
    let article = state
        .coordinator
        .submit_decision(&ArticleId::new(id), &caller, request.decision, request.comment)
        .await?;
    Ok(Json(article))
}
