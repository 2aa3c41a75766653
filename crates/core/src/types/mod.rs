//! Core types for Stallfront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod slug;
pub mod status;

pub use id::*;
pub use money::Cents;
pub use slug::{Slug, SlugError};
pub use status::{OrderStatus, OrderStatusError};
