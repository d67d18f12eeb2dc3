//! Storage configuration loader.
//!
//! Reads `storage.toml` from the data directory and deserializes it into
//! [`StorageConfig`]. Falls back to per-tier database files inside the
//! data directory when the file is missing or malformed. Handles are
//! always built from an explicit config by the composition root; nothing
//! here is a process-wide singleton.

use std::path::Path;

use chatvault_types::config::StorageConfig;

/// Returns the data directory based on the `CHATVAULT_DATA_DIR` env var,
/// falling back to `~/.chatvault`.
pub fn default_data_dir() -> String {
    std::env::var("CHATVAULT_DATA_DIR").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{home}/.chatvault")
    })
}

/// Load storage configuration from `{data_dir}/storage.toml`.
///
/// - If the file does not exist, returns defaults rooted at `data_dir`.
/// - If the file exists but fails to parse, logs a warning and returns the
///   defaults.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_storage_config(data_dir: &Path) -> StorageConfig {
    let config_path = data_dir.join("storage.toml");
    let defaults = StorageConfig::for_data_dir(&data_dir.display().to_string());

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No storage.toml found at {}, using defaults",
                config_path.display()
            );
            return defaults;
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return defaults;
        }
    };

    match toml::from_str::<StorageConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            defaults
        }
    }
}
