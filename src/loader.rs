//! Loading JSON inputs from disk.
//!
//! Used by the CLI and by serving processes at startup for deployment
//! configuration and payload files. The request pipeline itself never
//! touches the filesystem.

use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;
use crate::extensions::DeploymentConfig;

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::Read` if it can't be read, or `LoadError::InvalidJson`
/// if the contents aren't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_json_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a deployment configuration from a JSON file.
///
/// Missing keys default to empty; unknown extension names are not caught
/// here but by [`crate::ExtensionRegistry::from_config`].
///
/// # Errors
///
/// Same as [`load_json`], plus `LoadError::InvalidJson` when the document
/// doesn't match the configuration shape.
pub fn load_config(path: &Path) -> Result<DeploymentConfig, LoadError> {
    let value = load_json(path)?;
    serde_json::from_value(value).map_err(|source| LoadError::InvalidJson { source })
}
