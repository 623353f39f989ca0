//! Error types for ripple-core.
//!
//! The tracking and notification path never fails. Errors only surface at
//! the edges: ingesting JSON and converting a [`Value`](crate::reactive::Value)
//! into a concrete composite handle.

use thiserror::Error;

/// Result type for ripple-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ripple-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to parse or encode JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A composite value was expected but something else was found.
    #[error("expected a {expected}, found {found}")]
    NotComposite {
        expected: &'static str,
        found: &'static str,
    },
}
