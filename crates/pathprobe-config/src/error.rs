//! Errors raised while loading, saving or resolving bench plans.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, saving or resolving a bench plan.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Plan file could not be read
    #[error("cannot read bench plan '{path}': {source}")]
    ReadFile {
        /// Plan path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Plan file could not be written
    #[error("cannot write bench plan '{path}': {source}")]
    WriteFile {
        /// Plan path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML plan
    #[error("invalid TOML bench plan: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Plan could not be rendered as TOML
    #[error("cannot encode bench plan as TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Malformed JSON plan, or a plan that cannot be rendered as JSON
    #[error("invalid JSON bench plan: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// File extension is neither `.toml` nor `.json`
    #[error("unsupported config format for '{0}' (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),

    /// A setting is outside its meaningful range
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Name of the offending setting.
        key: String,
        /// Description of why the value is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// [`ConfigError::ReadFile`] for `path`.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::WriteFile`] for `path`.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::InvalidValue`] for setting `key`.
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
