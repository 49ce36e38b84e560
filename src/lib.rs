//! Recruitment-tracking REST backend: candidates, applications, and token-authenticated
//! users, served through one generic record accessor.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod models;
pub mod record;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use auth::{AuthService, TokenService};
pub use error::{AccessError, AppError, ConfigError};
pub use migration::apply_migrations;
pub use record::Record;
pub use registry::Registry;
pub use routes::build_router;
pub use service::Accessor;
pub use settings::{Settings, StoreBackend};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store, UnitOfWork};
