//! Candidate handlers, including the nested application routes.

use super::{body_to_record, create_failed, not_found_as, parse_id};
use crate::error::AppError;
use crate::models::{Application, ApplicationStatus, Candidate};
use crate::record::Record;
use crate::registry::Entity;
use crate::response::{created, ok, typed, typed_all};
use crate::service::Accessor;
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub skill: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationListParams {
    pub status: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let data = body_to_record(body)?;
    let mut uow = state.begin().await?;
    let row = Accessor::new(&state.registry, &mut uow)
        .create(Candidate::TABLE, &data)
        .await
        .map_err(|e| create_failed("Failed to create candidate", e))?;
    uow.commit()
        .await
        .map_err(|e| create_failed("Failed to create candidate", e.into()))?;
    let candidate: Candidate = typed(row)?;
    Ok(created(candidate))
}

pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let mut filters = Record::new();
    if let Some(skill) = params.skill.filter(|s| !s.is_empty()) {
        filters.insert("skills", Value::String(skill));
    }
    let mut uow = state.begin().await?;
    let rows = Accessor::new(&state.registry, &mut uow)
        .find_many(Candidate::TABLE, &filters, params.limit, params.offset)
        .await?;
    let candidates: Vec<Candidate> = typed_all(rows)?;
    Ok(ok(candidates))
}

pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let mut uow = state.begin().await?;
    let row = Accessor::new(&state.registry, &mut uow)
        .find_one(Candidate::TABLE, &Record::new().with("id", id))
        .await
        .map_err(|e| not_found_as("Candidate not found", e))?;
    let candidate: Candidate = typed(row)?;
    Ok(ok(candidate))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let changes = body_to_record(body)?;
    let mut uow = state.begin().await?;
    let row = Accessor::new(&state.registry, &mut uow)
        .update(Candidate::TABLE, &Record::new().with("id", id), &changes)
        .await
        .map_err(|e| not_found_as("Candidate not found", e))?;
    uow.commit().await?;
    let candidate: Candidate = typed(row)?;
    Ok(ok(candidate))
}

pub async fn create_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let mut data = body_to_record(body)?;
    data.insert("candidate_id", Value::String(id));
    let mut uow = state.begin().await?;
    let row = Accessor::new(&state.registry, &mut uow)
        .create(Application::TABLE, &data)
        .await
        .map_err(|e| create_failed("Failed to create application", e))?;
    uow.commit()
        .await
        .map_err(|e| create_failed("Failed to create application", e.into()))?;
    let application: Application = typed(row)?;
    Ok(created(application))
}

pub async fn list_applications(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<ApplicationListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let id = parse_id(&id)?;
    let mut filters = Record::new().with("candidate_id", id);
    if let Some(status) = params.status.filter(|s| !s.is_empty()) {
        let status: ApplicationStatus = status.parse()?;
        filters.insert("status", Value::String(status.as_str().to_string()));
    }
    let mut uow = state.begin().await?;
    let rows = Accessor::new(&state.registry, &mut uow)
        .find_many(Application::TABLE, &filters, None, None)
        .await?;
    let applications: Vec<Application> = typed_all(rows)?;
    Ok(ok(applications))
}
