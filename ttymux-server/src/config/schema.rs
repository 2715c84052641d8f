//! Configuration schema structs

use serde::{Deserialize, Serialize};

/// Default number of output records kept per terminal
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default ceiling on live request ids per resolver
pub const DEFAULT_MAX_REQUEST_IDS: u32 = 65536;

/// Default per-viewer outbound queue length
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tty: TtyConfig,
    pub viewers: ViewerConfig,
    pub logging: LoggingConfig,
}

/// Process-wide settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Socket path override (defaults to the XDG runtime dir)
    pub socket_path: Option<String>,
}

/// Terminal settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtyConfig {
    /// Output records replayable per terminal
    pub cache_capacity: usize,
    /// Upper bound on request ids a single resolver may hold at once
    pub max_request_ids: u32,
}

impl Default for TtyConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_request_ids: DEFAULT_MAX_REQUEST_IDS,
        }
    }
}

/// Viewer connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Messages buffered per viewer before deliveries are dropped
    pub queue_capacity: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `TTYMUX_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}
