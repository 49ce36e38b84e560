use crate::handlers::candidate::{create, create_application, list, list_applications, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

/// Candidate routes; the collection is served with and without a trailing slash.
pub fn candidate_routes() -> Router<AppState> {
    Router::new()
        .route("/candidates", get(list).post(create))
        .route("/candidates/", get(list).post(create))
        .route("/candidates/:id", get(read).put(update))
        .route(
            "/candidates/:id/applications",
            get(list_applications).post(create_application),
        )
}
