//! Error types for corpus storage.

use thiserror::Error;

use crate::types::SourceKind;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A corpus entry was addressed that does not exist. Confidence and
    /// usage updates never create rows.
    #[error("corpus entry not found: {kind}:{id}")]
    EntryNotFound { kind: SourceKind, id: String },

    /// A knowledge article was addressed that does not exist.
    #[error("article not found: {0}")]
    ArticleNotFound(String),

    /// A resolved case was addressed that does not exist.
    #[error("case not found: {0}")]
    CaseNotFound(String),

    /// A conversation was addressed that does not exist.
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    /// A learning event was addressed that does not exist.
    #[error("learning event not found: {0}")]
    EventNotFound(String),

    /// A learning event was reviewed a second time. Events are strictly
    /// pending -> finalized.
    #[error("learning event already reviewed: {0}")]
    AlreadyReviewed(String),

    /// An embedding did not match the corpus dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_not_found_display() {
        let err = StoreError::EntryNotFound {
            kind: SourceKind::Script,
            id: "SCR-1".into(),
        };
        assert_eq!(err.to_string(), "corpus entry not found: SCRIPT:SCR-1");
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = StoreError::DimensionMismatch {
            expected: 8,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "embedding dimension mismatch: expected 8, got 4"
        );
    }
}
