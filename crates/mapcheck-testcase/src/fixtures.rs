//! Fixture resources.
//!
//! Fixture loading is an injected collaborator rather than ambient global
//! state: callers pass a [`ResourceLoader`] implementation, so the
//! harness's own tests can substitute in-memory fixtures.

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or parsing fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The path does not resolve.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed fixture JSON.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Returns raw fixture text given a path.
pub trait ResourceLoader {
    fn load(&self, path: &str) -> Result<String, FixtureError>;
}

/// Loader rooted at a filesystem directory.
#[derive(Debug, Clone)]
pub struct FsResourceLoader {
    root: PathBuf,
}

impl FsResourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceLoader for FsResourceLoader {
    fn load(&self, path: &str) -> Result<String, FixtureError> {
        let full = self.root.join(path);
        std::fs::read_to_string(&full).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FixtureError::NotFound(full.display().to_string())
            } else {
                FixtureError::Io(e)
            }
        })
    }
}

/// In-memory fixtures for the harness's own test suite.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResources {
    entries: HashMap<String, String>,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.entries.insert(path.into(), content.into());
        self
    }
}

impl ResourceLoader for InMemoryResources {
    fn load(&self, path: &str) -> Result<String, FixtureError> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| FixtureError::NotFound(path.to_string()))
    }
}

/// Parse fixture text into a generic JSON tree.
pub fn parse_json(text: &str) -> Result<serde_json::Value, FixtureError> {
    Ok(serde_json::from_str(text)?)
}
