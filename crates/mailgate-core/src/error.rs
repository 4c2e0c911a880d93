//! Error types shared across the gateway
//!
//! Expected conditions (unknown provider, full job store) are explicit
//! variants consumed by callers to pick an HTTP status; they are never
//! surfaced as panics.

use thiserror::Error;

/// Result type alias for operations that can fail with a gateway error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gateway core.
#[derive(Debug, Error)]
pub enum Error {
    /// A batch was partitioned with a zero chunk size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    /// The requested provider is not registered.
    #[error("provider \"{0}\" is not registered")]
    UnknownProvider(String),

    /// The job store is at capacity and cleanup freed no room.
    #[error("job store at capacity, try again later")]
    StoreFull,

    /// Network-level failure talking to a provider.
    #[error("transport error: {0}")]
    Transport(String),

    /// A provider returned a result list whose length does not match the input.
    #[error("provider returned {got} results for {expected} emails")]
    ResultCountMismatch {
        /// Number of emails submitted.
        expected: usize,
        /// Number of results returned.
        got: usize,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error describes a condition the client can recover from
    /// by retrying later, as opposed to a malformed request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::StoreFull | Error::Transport(_))
    }
}
