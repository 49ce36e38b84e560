//! Shared application state for all routes.

use crate::auth::AuthService;
use crate::error::AppError;
use crate::registry::Registry;
use crate::store::{Store, UnitOfWork};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: Arc<Registry>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, registry: Arc<Registry>, auth: AuthService) -> Self {
        AppState {
            store,
            registry,
            auth: Arc::new(auth),
        }
    }

    /// Open the unit of work for one request.
    pub async fn begin(&self) -> Result<UnitOfWork, AppError> {
        Ok(UnitOfWork::begin(self.store.as_ref()).await?)
    }
}
