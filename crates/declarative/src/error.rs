//! Error types for graph construction and template handling

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while declaring resources or handling templates
#[derive(Error, Debug)]
pub enum GraphError {
    /// Logical id is empty, too long, or not alphanumeric
    #[error("invalid logical id '{0}': must be 1-255 ASCII alphanumeric characters")]
    InvalidLogicalId(String),

    /// A resource with the same logical id was already declared
    #[error("duplicate logical id '{0}'")]
    DuplicateLogicalId(String),

    /// An output with the same name was already added
    #[error("duplicate output '{0}'")]
    DuplicateOutput(String),

    /// A property or dependency points at a resource that is not declared yet
    #[error("'{from}' references '{target}', which has not been declared")]
    UnresolvedReference { from: String, target: String },

    /// Template JSON could not be produced or parsed
    #[error("template serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Template file could not be read or written
    #[error("failed to access template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
