//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod status;

pub use id::*;
pub use money::{format_amount, has_valid_scale, parse_amount};
pub use status::*;
