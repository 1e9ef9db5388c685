//! Job posting query endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::JobPosting;

/// GET /api/jobs/:id - Get one posting by its job url id
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobPosting>> {
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(Error::invalid_input("Job ID is required"));
    }

    let fallback_to_id = state.config().query.fallback_to_id;
    let lookup = id.clone();
    let posting = state
        .with_store(move |store| match store.get_by_job_url_id(&lookup)? {
            Some(posting) => Ok(Some(posting)),
            None if fallback_to_id => store.get_by_id(&lookup),
            None => Ok(None),
        })
        .await?;

    posting.map(Json).ok_or(Error::JobNotFound(id))
}

/// GET /api/jobs - List postings, optionally filtered by the configured key
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<JobPosting>>> {
    let key = state.filter_key();
    let filter = params
        .get(key.param())
        .filter(|value| !value.is_empty())
        .cloned();

    let postings = state
        .with_store(move |store| match filter {
            Some(value) => store.list_by(key, &value),
            None => store.list_all(),
        })
        .await?;

    tracing::debug!("Listing {} postings", postings.len());
    Ok(Json(postings))
}
