//! Domain records and their registration.

mod application;
mod candidate;
mod user;

pub use application::{Application, ApplicationStatus};
pub use candidate::Candidate;
pub use user::User;

use crate::error::RegistryError;
use crate::registry::Registry;

/// Registry holding every table the API serves. Candidates come before
/// applications so that schema bootstrap creates referenced tables first.
pub fn registry() -> Result<Registry, RegistryError> {
    Registry::builder()
        .register::<User>()
        .register::<Candidate>()
        .register::<Application>()
        .build()
}
