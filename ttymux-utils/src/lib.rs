//! ttymux-utils: Common utilities shared across ttymux crates
//!
//! This crate provides:
//! - Unified error types ([`TtymuxError`], [`Result`])
//! - Logging infrastructure ([`init_logging`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Result, TtymuxError};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogOutput};
pub use paths::{config_dir, config_file, log_dir, runtime_dir, socket_path, state_dir};
