//! Application status updates.

use super::{not_found_as, parse_id};
use crate::error::AppError;
use crate::models::{Application, ApplicationStatus};
use crate::record::Record;
use crate::registry::Entity;
use crate::response::{ok, typed};
use crate::service::Accessor;
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdate {
    pub application_status: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<StatusUpdate>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let id = parse_id(&id)?;
    let status: ApplicationStatus = params
        .application_status
        .ok_or_else(|| AppError::Validation("application_status is required".into()))?
        .parse()?;
    let changes = Record::new().with("status", status.as_str());
    let mut uow = state.begin().await?;
    let row = Accessor::new(&state.registry, &mut uow)
        .update(Application::TABLE, &Record::new().with("id", id), &changes)
        .await
        .map_err(|e| not_found_as("Application not found", e))?;
    uow.commit().await?;
    let application: Application = typed(row)?;
    Ok(ok(application))
}
