//! Signup, login and token inspection.

use crate::auth::Credentials;
use crate::error::AppError;
use crate::extractors::BearerToken;
use crate::response::{created, ok};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};

pub async fn signup(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.signup(&creds).await?;
    Ok(created(user))
}

pub async fn login(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let token = state.auth.login(&creds).await?;
    Ok(ok(token))
}

pub async fn validate_token(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse, AppError> {
    let info = state.auth.inspect(&token)?;
    Ok(ok(info))
}
