//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use booking_store::Subject;
use common::SubjectId;
use domain::CreateSubject;
use serde::{Deserialize, Serialize};

use super::parse_tags;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateSubjectRequest {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct AddTagsRequest {
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSubjectsQuery {
    /// Comma-separated tags every returned subject must carry.
    pub tags: Option<String>,
    /// Exact subject name.
    pub name: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct SubjectResponse {
    pub id: SubjectId,
    pub name: String,
    pub tags: Vec<String>,
}

// -- Handlers --

/// POST /subjects: add a subject, optionally tagged.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSubjectRequest>,
) -> Result<(StatusCode, Json<SubjectResponse>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    check_tags(&req.tags)?;
    let subject = state
        .catalog
        .add_subject(CreateSubject::new(req.name).with_tags(req.tags))
        .await?;
    let tags = state.catalog.subject_tags(subject.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubjectResponse {
            id: subject.id,
            name: subject.name,
            tags,
        }),
    ))
}

/// GET /subjects: list subjects, filtered by `tags` or looked up by `name`.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSubjectsQuery>,
) -> Result<Json<Vec<Subject>>, ApiError> {
    if let Some(name) = query.name {
        let subject = state.catalog.find_by_name(&name).await?;
        return Ok(Json(vec![subject]));
    }

    let tags = parse_tags(query.tags.as_deref());
    let subjects = if tags.is_empty() {
        state.catalog.list_subjects().await?
    } else {
        state.catalog.find_by_tags(&tags).await?
    };
    Ok(Json(subjects.into_vec()))
}

/// GET /subjects/{id}: a subject with its tags.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SubjectResponse>, ApiError> {
    let subject = state.catalog.get(SubjectId::new(id)).await?;
    let tags = state.catalog.subject_tags(subject.id).await?;
    Ok(Json(SubjectResponse {
        id: subject.id,
        name: subject.name,
        tags,
    }))
}

/// DELETE /subjects/{id}: remove a subject and its tags.
#[tracing::instrument(skip(state))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog.remove_subject(SubjectId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /subjects/{id}/tags: tags of a subject in alphabetical order.
#[tracing::instrument(skip(state))]
pub async fn tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.catalog.subject_tags(SubjectId::new(id)).await?))
}

/// POST /subjects/{id}/tags: attach tags, stopping at the first failure.
#[tracing::instrument(skip(state, req))]
pub async fn add_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AddTagsRequest>,
) -> Result<StatusCode, ApiError> {
    check_tags(&req.tags)?;
    state
        .catalog
        .add_tags(SubjectId::new(id), &req.tags)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn check_tags(tags: &[String]) -> Result<(), ApiError> {
    if tags.iter().any(|t| t.trim().is_empty()) {
        return Err(ApiError::BadRequest("tags must not be empty".to_string()));
    }
    Ok(())
}
