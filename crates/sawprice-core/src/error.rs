use thiserror::Error;

use crate::session::SessionError;

/// Validation and contract errors exposed by `sawprice-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("listing title must not be empty")]
    MissingTitle,
    #[error("listing url must not be empty")]
    MissingUrl,
    #[error("listing url must be absolute: '{value}'")]
    RelativeUrl { value: String },

    #[error("region code must be two ASCII letters: '{value}'")]
    InvalidRegion { value: String },

    #[error("invalid source '{value}', expected one of facebook, offerup, mercari")]
    InvalidSource { value: String },

    #[error("orchestrator requires at least one source adapter")]
    NoAdapters,
    #[error("source '{source_id}' is registered more than once")]
    DuplicateSource { source_id: String },

    #[error("config value for '{key}' is invalid: '{value}'")]
    InvalidConfig { key: &'static str, value: String },
    #[error("renderer '{value}' is not available in this build")]
    UnsupportedRenderer { value: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
