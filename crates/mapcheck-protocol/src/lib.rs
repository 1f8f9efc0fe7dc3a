//! Message model for payload-mapping verification.
//!
//! Two message shapes exist: the [`ExternalMessage`] as seen on the
//! device/transport side (headers plus a text or byte payload), and the
//! normalized [`ProtocolMessage`] envelope used by the platform after
//! mapping (topic, path, value, headers, status). [`StructuredMessage`]
//! is the tagged union over both that the comparator and the test-case
//! orchestrator operate on.

pub mod envelope;
pub mod error;
pub mod external;
pub mod headers;
pub mod message;

pub use envelope::ProtocolMessage;
pub use error::{Error, Result};
pub use external::{ExternalMessage, ExternalMessageBuilder, Payload};
pub use headers::{HeaderMap, CONTENT_TYPE_HEADER};
pub use message::StructuredMessage;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
