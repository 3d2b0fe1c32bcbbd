//! Error types for the convergence system
//!
//! This module defines all error types used throughout the crate.
//!
//! The taxonomy deliberately separates the two failure classes a
//! `ResourceClient` can surface:
//!
//! - [`Error::Query`]: the current remote state could not be determined
//!   (remote unreachable, auth failure, malformed response). Never to be
//!   confused with "the resource does not exist": genuine absence is
//!   `Ok(ObservedState::Absent)`, not an error.
//! - [`Error::Mutation`]: a create/delete/update call was rejected or
//!   failed partway.
//! - [`Error::Unsupported`]: an update was requested from a client whose
//!   resource type has no in-place update capability.

use thiserror::Error;

/// Result type alias for convergence operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the convergence system
#[derive(Error, Debug)]
pub enum Error {
    /// The current remote state could not be determined
    #[error("query failed: {0}")]
    Query(String),

    /// A mutating call (create/delete/update) was rejected or failed
    #[error("mutation failed: {0}")]
    Mutation(String),

    /// The client does not implement the requested operation
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// A desired-state declaration violates the engine contract
    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),

    /// I/O errors (config file loading)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Client-specific error
    #[error("client error ({client}): {message}")]
    Client {
        /// Client name
        client: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a query error
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Create a mutation error
    pub fn mutation(msg: impl Into<String>) -> Self {
        Self::Mutation(msg.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-declaration error
    pub fn invalid_declaration(msg: impl Into<String>) -> Self {
        Self::InvalidDeclaration(msg.into())
    }

    /// Create a client-specific error
    pub fn client(client: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Client {
            client: client.into(),
            message: message.into(),
        }
    }

    /// Whether this error arose while determining current state
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query(_))
    }

    /// Whether this error arose from a mutating call
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Mutation(_) | Self::Unsupported(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
