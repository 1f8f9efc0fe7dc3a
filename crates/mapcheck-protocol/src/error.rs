//! Error types for the message model.

use thiserror::Error;

/// Result type for message-model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or decoding messages.
#[derive(Debug, Error)]
pub enum Error {
    /// A JSON tree could not be decoded into a message.
    #[error("Codec error: {0}")]
    Codec(String),

    /// An external message was built with zero or two payloads.
    #[error("External message requires exactly one of text or byte payload")]
    MissingPayload,
}
