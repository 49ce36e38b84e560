use crate::handlers::auth::{login, signup, validate_token};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

/// Public auth routes. `/auth/token/validate` reads the bearer token itself.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/token/validate", get(validate_token))
}
