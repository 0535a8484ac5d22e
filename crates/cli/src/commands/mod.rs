//! CLI command implementations.

pub mod manifest;
pub mod product;
pub mod promo;

use std::path::PathBuf;

use atelier_admin::AppError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// An orchestrator action failed; `message` is what the operator sees.
    #[error("{message}")]
    Action {
        message: String,
        #[source]
        source: AppError,
    },

    /// The manifest or one of its images could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid YAML for a product.
    #[error("Failed to parse manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An amount argument is not a number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A manifest refers to a color the product does not have.
    #[error("Unknown color in manifest: {0}")]
    UnknownColor(String),
}

impl CommandError {
    /// Wrap an orchestrator error with the message to show for it.
    pub fn action(default: &'static str) -> impl FnOnce(AppError) -> Self {
        move |source| Self::Action {
            message: source.user_message(default),
            source,
        }
    }
}
