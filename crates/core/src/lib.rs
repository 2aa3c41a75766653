//! Stallfront Core - Shared types library.
//!
//! This crate provides common types used across all Stallfront components:
//! - `server` - Multi-tenant point-of-sale backend
//! - `integration-tests` - End-to-end test suite
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, slugs, money amounts,
//!   and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
