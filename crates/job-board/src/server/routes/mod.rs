//! API routes for the job board server

pub mod jobs;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::server::state::AppState;
use crate::types::Category;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Job postings (GET only; HEAD would otherwise be served by the GET handler)
        .route(
            "/jobs",
            get(jobs::list_jobs)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route(
            "/jobs/:id",
            get(jobs::get_job)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        // Category table shared with the crawler
        .route("/categories", get(categories))
        // Info
        .route("/info", get(info))
}

/// 405 for any method other than GET on the job endpoints
async fn method_not_allowed(method: Method) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET")],
        format!("Method {} Not Allowed", method),
    )
        .into_response()
}

/// GET /api/categories - The configured crawl categories
async fn categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.config().crawler.categories.clone())
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let filter_param = state.filter_key().param();

    Json(serde_json::json!({
        "name": "job-board",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Job postings crawled from careers sites",
        "filter_key": filter_param,
        "endpoints": {
            "GET /api/jobs": format!("List postings, optionally filtered by ?{}=<label>", filter_param),
            "GET /api/jobs/:id": "Get one posting by job url id",
            "GET /api/categories": "List crawl categories",
        }
    }))
}
