//! Error types for the session store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or persisting session data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("storage I/O failed for {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory state could not be serialized.
    #[error("failed to serialize {key}: {source}")]
    SerializeError {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A storage key contains characters that cannot name a file.
    #[error("invalid storage key: {key}")]
    InvalidKey { key: String },

    /// A prompt mode other than `ask` or `clarify` was requested.
    #[error("unknown prompt mode: {value} (expected 'ask' or 'clarify')")]
    InvalidPromptMode { value: String },

    /// No data directory could be determined for the platform.
    #[error("could not determine a data directory")]
    NoDataDir,
}

impl StoreError {
    /// Create an IO error.
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serialize_error(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::SerializeError {
            key: key.into(),
            source,
        }
    }

    /// Create an invalid key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Create an invalid prompt mode error.
    pub fn invalid_prompt_mode(value: impl Into<String>) -> Self {
        Self::InvalidPromptMode {
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = StoreError::io_error(
            "/data/delta_session.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/data/delta_session.json"));
        assert!(err.to_string().contains("storage I/O failed"));
    }

    #[test]
    fn test_invalid_key_display() {
        let err = StoreError::invalid_key("../escape");
        assert_eq!(err.to_string(), "invalid storage key: ../escape");
    }

    #[test]
    fn test_invalid_prompt_mode_display() {
        let err = StoreError::invalid_prompt_mode("shout");
        assert_eq!(
            err.to_string(),
            "unknown prompt mode: shout (expected 'ask' or 'clarify')"
        );
    }
}
