//! Error types for script execution.

use thiserror::Error;

/// Result type for script operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or invoking a mapping script.
#[derive(Debug, Error)]
pub enum Error {
    /// The source does not parse or evaluate, or defines no entry point.
    #[error("Script load failed: {0}")]
    Load(String),

    /// The script raised during invocation.
    #[error("Script runtime error: {message}")]
    Runtime {
        /// Rendered interpreter error, including position info when the
        /// engine provides it.
        message: String,
    },

    /// Execution exceeded the configured wall-clock budget.
    #[error("Script execution exceeded {budget_ms} ms budget")]
    Timeout { budget_ms: u64 },

    /// The script completed but its result is not a usable message.
    #[error("Invalid mapping result: {0}")]
    InvalidResult(String),
}
