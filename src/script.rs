//! Lifecycle script sources
//!
//! The stack builder never touches the filesystem itself. It asks a
//! [`ScriptSource`] for the bytes behind a path, so the CLI can read real
//! files (or stdin) while tests hand over in-memory content.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while obtaining a script
#[derive(Error, Debug)]
pub enum ScriptError {
    /// No script exists at the path
    #[error("startup script not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The script exists but has no content
    #[error("startup script is empty: {}", .0.display())]
    Empty(PathBuf),

    /// The script could not be read
    #[error("failed to read startup script {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Supplies script bytes for a path
pub trait ScriptSource {
    fn read_script(&self, path: &Path) -> Result<Vec<u8>, ScriptError>;
}

/// Reads scripts from disk, resolving relative paths against a base directory
#[derive(Debug, Clone, Default)]
pub struct FsScriptSource {
    base_dir: Option<PathBuf>,
}

impl FsScriptSource {
    /// Resolve relative paths against the current directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base_dir`
    pub fn relative_to(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Path actually read for a requested path
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let expanded = crate::paths::expand(&path.to_string_lossy());
        match &self.base_dir {
            Some(base) if expanded.is_relative() => base.join(expanded),
            _ => expanded,
        }
    }
}

impl ScriptSource for FsScriptSource {
    fn read_script(&self, path: &Path) -> Result<Vec<u8>, ScriptError> {
        let resolved = self.resolve(path);
        log::debug!("Reading startup script from {}", resolved.display());

        let bytes = fs::read(&resolved).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ScriptError::NotFound(resolved.clone())
            } else {
                ScriptError::Io {
                    path: resolved.clone(),
                    source,
                }
            }
        })?;

        if bytes.is_empty() {
            return Err(ScriptError::Empty(resolved));
        }
        Ok(bytes)
    }
}

/// Scripts held in memory, keyed by the exact requested path
#[derive(Debug, Clone, Default)]
pub struct InMemoryScriptSource {
    scripts: HashMap<PathBuf, Vec<u8>>,
}

impl InMemoryScriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script under a path
    pub fn with_script(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.scripts.insert(path.into(), content.into());
        self
    }
}

impl ScriptSource for InMemoryScriptSource {
    fn read_script(&self, path: &Path) -> Result<Vec<u8>, ScriptError> {
        match self.scripts.get(path) {
            None => Err(ScriptError::NotFound(path.to_path_buf())),
            Some(bytes) if bytes.is_empty() => Err(ScriptError::Empty(path.to_path_buf())),
            Some(bytes) => Ok(bytes.clone()),
        }
    }
}
