//! Tagged union over the two message shapes.

use crate::envelope::ProtocolMessage;
use crate::external::ExternalMessage;

/// Either side of a mapping: a device-side external message or a
/// normalized protocol envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredMessage {
    External(ExternalMessage),
    Protocol(ProtocolMessage),
}

impl StructuredMessage {
    /// Message kind name, used in comparison and failure reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::External(_) => "external",
            Self::Protocol(_) => "protocol",
        }
    }

    pub fn as_external(&self) -> Option<&ExternalMessage> {
        match self {
            Self::External(message) => Some(message),
            Self::Protocol(_) => None,
        }
    }

    pub fn as_protocol(&self) -> Option<&ProtocolMessage> {
        match self {
            Self::External(_) => None,
            Self::Protocol(message) => Some(message),
        }
    }
}

impl From<ExternalMessage> for StructuredMessage {
    fn from(message: ExternalMessage) -> Self {
        Self::External(message)
    }
}

impl From<ProtocolMessage> for StructuredMessage {
    fn from(message: ProtocolMessage) -> Self {
        Self::Protocol(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        let protocol: StructuredMessage = ProtocolMessage::new("t", "/").into();
        assert_eq!(protocol.kind(), "protocol");
        assert!(protocol.as_protocol().is_some());
        assert!(protocol.as_external().is_none());
    }
}
