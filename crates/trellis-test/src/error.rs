//! Test error types.

use thiserror::Error;

/// Errors that can occur during testing.
#[derive(Debug, Error)]
pub enum TestError {
    /// Request building failed.
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// Header name or value is invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A registered pattern is not a valid regex.
    #[error("pattern '{pattern}' does not compile: {source}")]
    InvalidPattern {
        /// The registered pattern.
        pattern: String,
        /// The regex error.
        #[source]
        source: regex::Error,
    },
}
