//! Article handlers

use crate::api::rest::identity::caller_from_headers;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use editorial_coordinator::{ContentUpdate, NewArticle};
use editorial_storage::QueryWindow;
use editorial_types::{Article, ArticleId, ArticleStatus, ReviewerEntry, UserId, WorkflowAction};
use serde::{Deserialize, Serialize};

/// List articles query
#[derive(Debug, Deserialize)]
pub struct ListArticlesQuery {
    pub status: Option<String>,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

/// Add contributor request
#[derive(Debug, Deserialize)]
pub struct AddContributorRequest {
    pub user_id: UserId,
}

/// Review history query
#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    /// Only rows of the current review cycle
    #[serde(default)]
    pub current: bool,
}

/// Available actions response
#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub article_id: ArticleId,
    pub status: ArticleStatus,
    pub actions: Vec<WorkflowAction>,
}

/// Create a new draft owned by the caller
pub async fn create_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NewArticle>,
) -> ApiResult<(StatusCode, Json<Article>)> {
    let caller = caller_from_headers(&state, &headers)?;
    let article = state.coordinator.create_article(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// List live articles, optionally filtered by status
pub async fn list_articles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListArticlesQuery>,
) -> ApiResult<Json<Vec<Article>>> {
    caller_from_headers(&state, &headers)?;
    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<ArticleStatus>()
                .map_err(|_| ApiError::BadRequest(format!("unknown status: {}", s)))
        })
        .transpose()?;
    let window = QueryWindow {
        limit: query.limit,
        offset: query.offset,
    };
    let articles = state.coordinator.list_articles(status, window).await?;
    Ok(Json(articles))
}

/// Get a specific article
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Article>> {
    caller_from_headers(&state, &headers)?;
    let article = state.coordinator.get_article(&ArticleId::new(id)).await?;
    Ok(Json(article))
}

/// Soft delete an article
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let caller = caller_from_headers(&state, &headers)?;
    state
        .coordinator
        .delete_article(&ArticleId::new(id), &caller)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Edit title and/or body
pub async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<ContentUpdate>,
) -> ApiResult<Json<Article>> {
    let caller = caller_from_headers(&state, &headers)?;
    if update.is_empty() {
        return Err(ApiError::BadRequest(
            "nothing to update: provide title and/or body".to_string(),
        ));
    }
    let article = state
        .coordinator
        .update_content(&ArticleId::new(id), &caller, update)
        .await?;
    Ok(Json(article))
}

/// Owner adds a co-author
pub async fn add_contributor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<AddContributorRequest>,
) -> ApiResult<Json<Article>> {
    let caller = caller_from_headers(&state, &headers)?;
    let article = state
        .coordinator
        .add_contributor(&ArticleId::new(id), &caller, request.user_id)
        .await?;
    Ok(Json(article))
}

/// Reviewer ledger rows of an article
pub async fn list_article_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<ReviewsQuery>,
) -> ApiResult<Json<Vec<ReviewerEntry>>> {
    caller_from_headers(&state, &headers)?;
    let article_id = ArticleId::new(id);
    let reviews = if query.current {
        state.coordinator.current_reviews(&article_id).await?
    } else {
        state.coordinator.reviews(&article_id).await?
    };
    Ok(Json(reviews))
}

/// Actions the caller could take on the article right now
pub async fn available_actions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<ActionsResponse>> {
    let caller = caller_from_headers(&state, &headers)?;
    let article_id = ArticleId::new(id);
    let article = state.coordinator.get_article(&article_id).await?;
    let actions = state
        .coordinator
        .available_actions(&article_id, &caller)
        .await?;
    Ok(Json(ActionsResponse {
        article_id,
        status: article.status,
        actions,
    }))
}
