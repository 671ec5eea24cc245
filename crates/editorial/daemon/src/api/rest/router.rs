//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        // Articles
        .route(
            "/articles",
            get(handlers::list_articles).post(handlers::create_article),
        )
        .route(
            "/articles/:id",
            get(handlers::get_article).delete(handlers::delete_article),
        )
        .route("/articles/:id/content", put(handlers::update_content))
        .route("/articles/:id/contributors", post(handlers::add_contributor))
        .route("/articles/:id/reviews", get(handlers::list_article_reviews))
        .route("/articles/:id/actions", get(handlers::available_actions))
        // Edit locks
        .route(
            "/articles/:id/lock",
            get(handlers::lock_status)
                .post(handlers::acquire_lock)
                .put(handlers::renew_lock)
                .delete(handlers::release_lock),
        )
        // Workflow
        .route("/articles/:id/submit", post(handlers::submit_article))
        .route("/articles/:id/approve", post(handlers::approve_article))
        .route("/articles/:id/reject", post(handlers::reject_article))
        .route("/articles/:id/publish", post(handlers::publish_article))
        .route("/articles/:id/unpublish", post(handlers::unpublish_article))
        .route("/articles/:id/reopen", post(handlers::reopen_article))
        .route("/articles/:id/decisions", post(handlers::submit_decision))
        // Reviewer inbox
        .route("/reviews/pending/:level", get(handlers::pending_reviews));

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
