//! Fixture-driven verification of payload mappings.
//!
//! A test case wires an input message, a mapping function, and an expected
//! output message, runs the mapping, and applies a semantic comparator
//! that ignores serialization-order artifacts (object key order, header
//! case) while holding field values and array order exact.
//!
//! ```no_run
//! use mapcheck_protocol::{ExternalMessage, HeaderMap, ProtocolMessage};
//! use mapcheck_script::MappingFunction;
//! use mapcheck_testcase::{Direction, MappingTestCase};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let function = MappingFunction::from_javascript(
//!         "function mapFromExternal(headers, textPayload) { \
//!            return { topic: headers['device_id'], path: '/', value: textPayload }; \
//!          }",
//!     )?;
//!     let headers = HeaderMap::from([("device_id", "d1")]);
//!     let input = ExternalMessage::builder(headers).with_text("on").build()?;
//!     let expected = ProtocolMessage::new("d1", "/").with_value("on".into());
//!
//!     MappingTestCase::new()
//!         .given(input)?
//!         .mapped_by(&function, Direction::Incoming)?
//!         .is_equal_to(expected)?
//!         .verify()?;
//!     Ok(())
//! }
//! ```

pub mod compare;
pub mod error;
pub mod fixtures;
pub mod testcase;

pub use compare::{Comparator, ComparatorConfig, ComparisonResult, FieldPath, PathSegment};
pub use error::{Error, Result};
pub use fixtures::{FixtureError, FsResourceLoader, InMemoryResources, ResourceLoader};
pub use testcase::{Direction, MappingTestCase};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
