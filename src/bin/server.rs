//! recruit-server: loads settings, prepares the store, serves the API.

use recruit_api::{
    apply_migrations, build_router, ensure_database_exists, models, AppState, AuthService, MemoryStore,
    PgStore, Settings, Store, StoreBackend, TokenService,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;
    let default_directive = if settings.debug { "recruit_api=debug" } else { "recruit_api=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive)),
        )
        .init();

    let registry = Arc::new(models::registry()?);
    let store: Arc<dyn Store> = match settings.store_backend {
        StoreBackend::Postgres => {
            ensure_database_exists(&settings.database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&settings.database_url)
                .await?;
            apply_migrations(&pool, &registry).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let tokens = TokenService::new(&settings.jwt_secret, settings.jwt_algorithm, settings.token_ttl());
    let auth = AuthService::new(store.clone(), registry.clone(), tokens, settings.bcrypt_cost);
    let state = AppState::new(store, registry, auth);
    let app = build_router(state, &settings.cors_origins)?;

    let listener = TcpListener::bind(settings.listen_addr()).await?;
    tracing::info!("recruit-server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
