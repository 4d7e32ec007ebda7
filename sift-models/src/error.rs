//! Error types for provider ports.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to external providers.
#[derive(Debug, Error)]
pub enum Error {
    /// Provider API returned a non-success status or an error payload.
    #[error("provider API error: {0}")]
    ProviderApi(String),

    /// Request failed at the transport level (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Request(String),

    /// The provider kept returning values that do not match the requested
    /// schema, even after retries.
    #[error("structured output failed schema validation after {attempts} attempts: {reason}")]
    SchemaValidation { attempts: u32, reason: String },

    /// The provider returned an embedding of the wrong dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
