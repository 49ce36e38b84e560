use crate::handlers::application::update_status;
use crate::state::AppState;
use axum::{routing::patch, Router};

pub fn application_routes() -> Router<AppState> {
    Router::new().route("/applications/:id", patch(update_status))
}
