//! Atelier Admin library.
//!
//! Client side of the catalog back-office: a typed HTTP client for the
//! catalog API and the orchestrators behind the promo code table and the
//! product form.
//!
//! # Security
//!
//! Mutating calls carry the operator's bearer token. The token is held as a
//! `SecretString` and redacted from `Debug` output.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`api`] - `reqwest` client for products, categories and promo codes
//! - [`services`] - Promo table and product form orchestrators
//! - [`error`] - Orchestrator error type

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod services;

pub use api::{ApiClient, ApiError};
pub use config::{AdminConfig, ApiConfig, ConfigError, LogFormat};
pub use error::AppError;
pub use services::{CatalogBackend, ProductComposer, PromoBackend, PromoTable};
