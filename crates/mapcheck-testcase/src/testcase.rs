//! Test-case orchestrator.

use mapcheck_protocol::StructuredMessage;
use mapcheck_script::MappingFunction;
use tracing::debug;

use crate::compare::{Comparator, ComparatorConfig};
use crate::error::{Error, Result};

/// Mapping direction for a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device-side message in, protocol envelope out.
    Incoming,
    /// Protocol envelope in, device-side message out.
    Outgoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    New,
    Configured,
    Mapped,
    Verified,
}

/// Single-use verifier for one mapping test case.
///
/// Stages run strictly in order: [`given`](Self::given) →
/// [`mapped_by`](Self::mapped_by) → [`is_equal_to`](Self::is_equal_to) →
/// [`verify`](Self::verify). Driving the case out of order fails with
/// [`Error::Usage`]; a fresh instance is required per test case.
///
/// A mapping failure is captured at `mapped_by` and surfaced at `verify`,
/// never silently treated as an empty output.
#[derive(Debug, Default)]
pub struct MappingTestCase {
    state: State,
    input: Option<StructuredMessage>,
    outcome: Option<std::result::Result<StructuredMessage, mapcheck_script::Error>>,
    expected: Option<StructuredMessage>,
    comparator: Comparator,
}

impl Default for State {
    fn default() -> Self {
        Self::New
    }
}

impl MappingTestCase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a non-default comparator configuration. May be set any time
    /// before `verify`.
    pub fn with_comparator(&mut self, config: ComparatorConfig) -> &mut Self {
        self.comparator = Comparator::new(config);
        self
    }

    /// Bind the input message.
    pub fn given(&mut self, message: impl Into<StructuredMessage>) -> Result<&mut Self> {
        if self.state != State::New {
            return Err(Error::Usage("input message already given".to_string()));
        }
        self.input = Some(message.into());
        self.state = State::Configured;
        Ok(self)
    }

    /// Run the mapping, capturing either the output message or the
    /// propagated mapping error.
    pub fn mapped_by(&mut self, function: &MappingFunction, direction: Direction) -> Result<&mut Self> {
        if self.state != State::Configured {
            return Err(Error::Usage(match self.state {
                State::New => "no input message given".to_string(),
                _ => "mapping already performed".to_string(),
            }));
        }
        let outcome = match (direction, self.input.as_ref()) {
            (Direction::Incoming, Some(StructuredMessage::External(message))) => {
                function.map_incoming(message).map(StructuredMessage::from)
            }
            (Direction::Outgoing, Some(StructuredMessage::Protocol(message))) => {
                function.map_outgoing(message).map(StructuredMessage::from)
            }
            (Direction::Incoming, _) => {
                return Err(Error::Usage(
                    "incoming mapping requires an external input message".to_string(),
                ));
            }
            (Direction::Outgoing, _) => {
                return Err(Error::Usage(
                    "outgoing mapping requires a protocol input message".to_string(),
                ));
            }
        };

        debug!(ok = outcome.is_ok(), ?direction, "mapping performed");
        self.input = None;
        self.outcome = Some(outcome);
        self.state = State::Mapped;
        Ok(self)
    }

    /// Store the expected message. Does not compare yet.
    pub fn is_equal_to(&mut self, message: impl Into<StructuredMessage>) -> Result<&mut Self> {
        if self.state != State::Mapped {
            return Err(Error::Usage(
                "expectation must be set after the mapping was performed".to_string(),
            ));
        }
        if self.expected.is_some() {
            return Err(Error::Usage("expected message already set".to_string()));
        }
        self.expected = Some(message.into());
        Ok(self)
    }

    /// Perform the comparison, raising a descriptive failure on mismatch.
    /// Transitions to the terminal state exactly once: a second call fails
    /// with [`Error::Usage`] regardless of the first call's outcome.
    pub fn verify(&mut self) -> Result<()> {
        match self.state {
            State::Verified => {
                return Err(Error::Usage("verify already called".to_string()));
            }
            State::Mapped => {}
            _ => {
                return Err(Error::Usage("nothing mapped to verify".to_string()));
            }
        }
        self.state = State::Verified;

        let expected = self
            .expected
            .take()
            .ok_or_else(|| Error::Usage("no expected message set".to_string()))?;
        let actual = match self.outcome.take() {
            Some(Ok(message)) => message,
            Some(Err(error)) => return Err(Error::Mapping(error)),
            None => return Err(Error::Usage("nothing mapped to verify".to_string())),
        };

        if let Some(mismatch) = self.comparator.first_mismatch(&actual, &expected) {
            return Err(Error::Mismatch {
                path: mismatch.path.to_string(),
                expected: mismatch.right,
                actual: mismatch.left,
            });
        }
        Ok(())
    }
}
