//! Storage configuration types.
//!
//! `StorageConfig` represents `storage.toml`: one connection URL per tier.
//! Handles are built from this by whoever composes the system; nothing in
//! the engine reads configuration ambiently.

use serde::{Deserialize, Serialize};

/// Connection settings for one storage tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    /// Connection URL, e.g. `sqlite:///var/lib/chatvault/hot.db?mode=rwc`.
    pub database_url: String,
}

/// Top-level storage configuration: the hot and cold tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub hot: TierConfig,
    pub cold: TierConfig,
}

impl StorageConfig {
    /// Default configuration rooted at a data directory: `hot.db` and
    /// `cold.db` inside `data_dir`.
    pub fn for_data_dir(data_dir: &str) -> Self {
        Self {
            hot: TierConfig {
                database_url: format!("sqlite://{data_dir}/hot.db?mode=rwc"),
            },
            cold: TierConfig {
                database_url: format!("sqlite://{data_dir}/cold.db?mode=rwc"),
            },
        }
    }
}
