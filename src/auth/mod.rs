//! Password hashing, access tokens, and the login/signup flows.

pub mod password;
mod service;
pub mod token;

pub use service::{AccessToken, AuthService, Credentials, TokenInfo};
pub use token::{Claims, TokenService};
