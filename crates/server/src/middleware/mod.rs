//! Request extractors for authentication.

pub mod auth;

pub use auth::{CurrentSession, OrgAdmin};
