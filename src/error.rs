//! Error types for the model core.
//!
//! Construction-time misconfiguration is non-recoverable (the model cannot
//! be built). Per-batch errors fail that call only; the model instance
//! stays usable for subsequent well-formed calls.

use thiserror::Error;

/// Top-level error type for batching and model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Malformed batch, empty sequence, or a sequence containing the pad id
    /// as a real token.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A token id at or beyond the vocabulary size. Never clamped.
    #[error("token id {id} out of range for vocabulary of size {vocab_size}")]
    IndexOutOfRange { id: u32, vocab_size: usize },

    /// Unsupported cell kind, empty filter-width set, zero dimensions, and
    /// other fail-fast construction problems.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Label/feature dimensionality disagreement between a batch and the
    /// model it is fed to.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

/// Result type alias for model-core operations.
pub type ModelResult<T> = Result<T, ModelError>;
