//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session does not map to a live entry (never created, evicted, or deleted).
    #[error("Session not found: {0}")]
    NotFound(String),

    /// A fresh session identifier could not be produced.
    ///
    /// Only the failing `create` call is affected; retrying is safe.
    #[error("Failed to generate session identifier: {0}")]
    IdentifierGeneration(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
