//! Default configuration values
//!
//! These are embedded in the binary and used when no config file exists.

/// Default configuration as TOML (for reference/documentation)
pub const DEFAULT_CONFIG_TOML: &str = r##"
# ttymux configuration

[general]
# socket_path = "/run/user/1000/ttymux/ttymux.sock"

[tty]
cache_capacity = 1000
max_request_ids = 65536

[viewers]
queue_capacity = 1024

[logging]
filter = "info"
"##;
