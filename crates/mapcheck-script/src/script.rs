//! Loaded scripts and their entry points.

use std::sync::Arc;

/// The two well-known entry points of a mapping script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// `mapFromExternal(headers, textPayload, bytePayload, contentType)` —
    /// device-side message in, protocol envelope out.
    FromExternal,
    /// `mapToExternal(topic, path, value, headers, status)` — protocol
    /// envelope in, device-side message out.
    ToExternal,
}

impl EntryPoint {
    /// The JavaScript function name the script must define.
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::FromExternal => "mapFromExternal",
            Self::ToExternal => "mapToExternal",
        }
    }
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.function_name())
    }
}

/// A validated, immutable mapping script.
///
/// Produced by [`ScriptHost::load`](crate::ScriptHost::load). The source is
/// never mutated after load and the handle is cheap to clone; it may be
/// shared read-only across hosts. Each invocation still gets its own fresh
/// interpreter context.
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    source: Arc<str>,
    has_from_external: bool,
    has_to_external: bool,
}

impl ScriptHandle {
    pub(crate) fn new(source: Arc<str>, has_from_external: bool, has_to_external: bool) -> Self {
        Self {
            source,
            has_from_external,
            has_to_external,
        }
    }

    /// The script source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn source_arc(&self) -> Arc<str> {
        Arc::clone(&self.source)
    }

    /// Whether the script defines the given entry point as a function.
    pub fn defines(&self, entry: EntryPoint) -> bool {
        match entry {
            EntryPoint::FromExternal => self.has_from_external,
            EntryPoint::ToExternal => self.has_to_external,
        }
    }
}
