//! Request extractors.

mod auth;

pub use auth::{BearerToken, CurrentUser};
