//! Business logic: authentication and order placement.
//!
//! Services own validation and composition; the repositories in
//! [`crate::db`] own persistence. Handlers stay thin.

pub mod auth;
pub mod orders;
