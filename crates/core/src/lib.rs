//! Atelier Core - catalog and promo-code domain library.
//!
//! This crate provides the types and rules shared by the Atelier admin
//! components:
//! - `admin` - HTTP client for the catalog API and the form orchestrators
//! - `cli` - Command-line front-end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O and no HTTP
//! client. Form state lives here as plain serializable values updated through
//! reducers, so it can be tested without a server.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, amounts, sizes and statuses
//! - [`promo`] - Promo codes, status derivation, promo form state
//! - [`product`] - Products, product form state, multipart payload
//! - [`stock`] - Stock keys and per-variant quantities
//! - [`validation`] - Field-attributed validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod product;
pub mod promo;
pub mod stock;
pub mod types;
pub mod validation;

pub use types::*;
pub use validation::ValidationError;
