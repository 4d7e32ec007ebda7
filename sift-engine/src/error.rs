//! Error types for the retrieval and learning engine.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for sift-engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine was constructed with an inconsistent configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A request failed validation before any work was done.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The closed case could not be loaded. The learning loop's only
    /// fatal lookup.
    #[error("case not found: {0}")]
    CaseNotFound(String),

    /// A learning event was addressed that does not exist.
    #[error("learning event not found: {0}")]
    EventNotFound(String),

    /// A learning event was reviewed a second time.
    #[error("learning event already reviewed: {0}")]
    AlreadyReviewed(String),

    /// An article referenced by a learning event does not exist.
    #[error("article not found: {0}")]
    ArticleNotFound(String),

    /// Storage error.
    #[error("store error: {0}")]
    Store(#[from] sift_corpus::StoreError),

    /// Provider error.
    #[error("provider error: {0}")]
    Provider(#[from] sift_models::Error),
}

impl EngineError {
    /// Lift store-level not-found/state errors to their typed engine
    /// counterparts so callers can match on them.
    pub(crate) fn from_store(err: sift_corpus::StoreError) -> Self {
        match err {
            sift_corpus::StoreError::CaseNotFound(id) => Self::CaseNotFound(id),
            sift_corpus::StoreError::EventNotFound(id) => Self::EventNotFound(id),
            sift_corpus::StoreError::AlreadyReviewed(id) => Self::AlreadyReviewed(id),
            sift_corpus::StoreError::ArticleNotFound(id) => Self::ArticleNotFound(id),
            other => Self::Store(other),
        }
    }
}
