//! Infrastructure layer for Chatvault.
//!
//! Contains implementations of the traits defined in `chatvault-core`:
//! SQLite storage for both tiers, the SHA-256 identity hasher, the zstd
//! payload codec, and the TOML configuration loader.

pub mod codec;
pub mod config;
pub mod sqlite;
