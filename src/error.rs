//! Error types for schema compilation, validation, and normalization.

use std::path::PathBuf;
use thiserror::Error;

/// Errors constructing the extension registry or compiling a request
/// definition.
///
/// These are deployment configuration defects. They surface once at startup
/// and must prevent the process from accepting requests; none of them is
/// recoverable at request time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown extension \"{name}\": expected context, fields, query, sort, or transaction")]
    UnknownExtension { name: String },

    #[error("add-on \"{name}\" conflicts with a core extension name")]
    ConflictingAddOn { name: String },

    #[error("duplicate field \"{field}\" in request definition \"{definition}\"")]
    DuplicateField { definition: String, field: String },

    #[error("field \"{field}\" in \"{definition}\" maps to wire name \"{alias}\" already taken by another field")]
    AliasCollision {
        definition: String,
        field: String,
        alias: String,
    },

    #[error("compiled schema for \"{definition}\" is not a valid JSON Schema: {message}")]
    InvalidSchema { definition: String, message: String },

    #[error("default for field \"{field}\" in \"{definition}\" does not satisfy its own constraints")]
    InvalidDefault { definition: String, field: String },
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors validating raw transport input against a compiled schema.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<FieldError> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Single validation error with the offending parameter's path.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    /// JSON Pointer (RFC 6901) to the invalid parameter.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors extracting a request shape from bound arguments.
///
/// Bound input has already passed validation, so hitting one of these means
/// the binding and the shape disagree. That is an integration defect,
/// reported loudly instead of coerced.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("bound value for \"{field}\" has unexpected shape: expected {expected}, got {actual}")]
    UnexpectedShape {
        field: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("bound arguments missing field \"{field}\"")]
    MissingField { field: &'static str },
}

impl NormalizeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors loading JSON inputs (deployment configuration, payload files).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::Read { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_exit_code() {
        let err = ConfigError::UnknownExtension {
            name: "tiles".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn validate_error_exit_code() {
        let err = ValidateError::Invalid {
            errors: vec![FieldError {
                path: "/limit".into(),
                message: "expected integer".into(),
            }],
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("config.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = serde_json::from_str::<serde_json::Value>("not json")
            .map_err(|source| LoadError::InvalidJson { source })
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn field_error_display() {
        let err = FieldError {
            path: "/sortby".into(),
            message: "additional properties are not allowed".into(),
        };
        assert_eq!(
            err.to_string(),
            "/sortby: additional properties are not allowed"
        );
    }

    #[test]
    fn validate_error_counts_errors() {
        let err = ValidateError::Invalid {
            errors: vec![
                FieldError {
                    path: "/limit".into(),
                    message: "out of range".into(),
                },
                FieldError {
                    path: "/bbox".into(),
                    message: "too few items".into(),
                },
            ],
        };
        assert_eq!(err.to_string(), "validation failed with 2 error(s)");
    }
}
