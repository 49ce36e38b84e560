//! Router assembly: public routes, bearer-protected routes, CORS and body limit.

mod application;
mod auth;
mod candidate;
mod common;

pub use application::application_routes;
pub use auth::auth_routes;
pub use candidate::candidate_routes;
pub use common::common_routes;

use crate::error::ConfigError;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{http::HeaderValue, middleware, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Full application router. Candidate and application routes require a bearer
/// token that resolves to a stored user.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Result<Router, ConfigError> {
    let protected = candidate_routes()
        .merge(application_routes())
        .route_layer(middleware::from_extractor_with_state::<CurrentUser, AppState>(
            state.clone(),
        ));
    Ok(Router::new()
        .merge(common_routes())
        .merge(auth_routes())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(cors_layer(cors_origins)?),
        )
        .with_state(state))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).map_err(|e| ConfigError::Invalid {
                var: "CORS_ORIGINS",
                reason: format!("{}: {}", o, e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_origin_is_a_config_error() {
        let err = cors_layer(&["http://ok.example".into(), "bad\norigin".into()]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "CORS_ORIGINS", .. }));
    }
}
