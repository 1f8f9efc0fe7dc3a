//! Error types for test-case verification.

use thiserror::Error;

/// Result type for test-case operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a mapping test case.
#[derive(Debug, Error)]
pub enum Error {
    /// The test case was driven out of state-machine order. This is a
    /// harness-misuse bug, not a fixture problem.
    #[error("Test case misuse: {0}")]
    Usage(String),

    /// The mapping itself failed; carries the underlying script error.
    #[error("Mapping failed: {0}")]
    Mapping(#[from] mapcheck_script::Error),

    /// The mapped message differs from the expected fixture.
    #[error("Mismatch at {path}: expected {expected}, found {actual}")]
    Mismatch {
        /// Dotted field path of the first difference.
        path: String,
        expected: String,
        actual: String,
    },
}
