//! Sandboxed execution of payload-mapping scripts.
//!
//! Mapping scripts ship with a connector configuration and are untrusted by
//! construction. This crate runs them in an isolated JavaScript interpreter
//! (Boa) with no filesystem, network, or host bindings reachable from the
//! script, a wall-clock execution budget with forced abandonment, and a
//! fresh interpreter context per invocation so no state leaks between runs.
//!
//! [`ScriptHost`] loads and invokes raw scripts; [`MappingFunction`] binds a
//! loaded script to the two well-known entry points `mapFromExternal` and
//! `mapToExternal` and exposes typed incoming/outgoing operations.

pub mod error;
pub mod host;
pub mod mapping;
pub mod script;

pub use error::{Error, Result};
pub use host::{ScriptHost, ScriptHostConfig};
pub use mapping::MappingFunction;
pub use script::{EntryPoint, ScriptHandle};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
