pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
mod validation;

pub use repo_types::{CurrentUser, Socials, SocialsPatch};
pub use services::CredentialStore;
