//! Error types for ttymux
//!
//! Process-level failures shared by every ttymux crate. Failures of a single
//! read request are not represented here; they settle on that request's
//! handle instead.

use std::path::PathBuf;

/// Main error type for ttymux operations
#[derive(Debug, thiserror::Error)]
pub enum TtymuxError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Socket Errors ===

    #[error("Failed to bind socket {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TtymuxError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using TtymuxError
pub type Result<T> = std::result::Result<T, TtymuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = TtymuxError::Io(io_err);
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = TtymuxError::FileRead {
            path: PathBuf::from("/etc/ttymux.toml"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/etc/ttymux.toml"));
    }

    #[test]
    fn test_error_display_bind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err = TtymuxError::Bind {
            path: PathBuf::from("/tmp/ttymux.sock"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to bind socket"));
        assert!(msg.contains("/tmp/ttymux.sock"));
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = TtymuxError::ConfigInvalid {
            path: PathBuf::from("/home/user/.config/ttymux/config.toml"),
            message: "syntax error".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("syntax error"));
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(TtymuxError::config("x"), TtymuxError::Config(m) if m == "x"));
        assert!(matches!(TtymuxError::internal("x"), TtymuxError::Internal(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(TtymuxError::Io(_))));
    }
}
