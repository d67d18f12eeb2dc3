//! Pseudonymized user record.

use serde::{Deserialize, Serialize};

/// A registered user in the hot tier.
///
/// The external (Telegram) identifier is never persisted; only its SHA-256
/// digest is stored, and `telegram_id_hash` is unique across all users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal row id assigned by the hot store.
    pub id: i64,
    /// Lowercase hex digest of the external identifier.
    pub telegram_id_hash: String,
}
