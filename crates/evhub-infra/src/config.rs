//! Daemon configuration loader.
//!
//! Reads `evhubd.toml` and deserializes it into [`DaemonConfig`]. Falls back
//! to defaults when the file is missing or malformed, so the daemon always
//! starts.

use std::path::Path;

use evhub_types::config::DaemonConfig;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "evhubd.toml";

/// Load daemon configuration from `path`.
///
/// - If the file does not exist, returns [`DaemonConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
pub async fn load_daemon_config(path: &Path) -> DaemonConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return DaemonConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return DaemonConfig::default();
        }
    };

    match toml::from_str::<DaemonConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            DaemonConfig::default()
        }
    }
}
