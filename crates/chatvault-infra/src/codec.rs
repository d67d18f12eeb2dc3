//! Codec implementations: SHA-256 identity hashing and zstd payload
//! compression.
//!
//! Hashing is pure and deterministic; compression serializes the value to
//! canonical JSON and runs the zstd work on a blocking worker thread so it
//! never occupies a runtime worker under concurrent request load.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use chatvault_core::codec::{IdentityHasher, PayloadCodec};
use chatvault_types::error::CodecError;

/// Highest regular zstd compression level; the archive favors ratio over
/// speed since compression runs off the request path.
pub const MAX_COMPRESSION_LEVEL: i32 = 19;

/// SHA-256 implementation of [`IdentityHasher`].
///
/// Computes lowercase hex-encoded digests. Used so a reversible external
/// identifier is never persisted.
#[derive(Debug, Clone, Default)]
pub struct Sha256IdentityHasher;

impl Sha256IdentityHasher {
    /// Create a new hasher.
    pub fn new() -> Self {
        Self
    }
}

impl IdentityHasher for Sha256IdentityHasher {
    fn hash(&self, raw: &str) -> String {
        let digest = Sha256::digest(raw.as_bytes());
        format!("{:x}", digest)
    }
}

/// zstd implementation of [`PayloadCodec`].
#[derive(Debug, Clone)]
pub struct ZstdPayloadCodec {
    level: i32,
}

impl ZstdPayloadCodec {
    /// Create a codec at the maximal compression level.
    pub fn new() -> Self {
        Self {
            level: MAX_COMPRESSION_LEVEL,
        }
    }

    /// Create a codec at a specific zstd level.
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }

    /// Compress any serializable value: canonical JSON, then zstd.
    pub async fn compress_value<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let json = serde_json::to_vec(value).map_err(|e| CodecError::Serialize(e.to_string()))?;
        let level = self.level;
        tokio::task::spawn_blocking(move || zstd::encode_all(json.as_slice(), level))
            .await
            .map_err(|e| CodecError::Worker(e.to_string()))?
            .map_err(|e| CodecError::Compress(e.to_string()))
    }

    /// Inverse of [`Self::compress_value`].
    pub async fn decompress_value<T: DeserializeOwned>(
        &self,
        blob: &[u8],
    ) -> Result<T, CodecError> {
        let blob = blob.to_vec();
        let json = tokio::task::spawn_blocking(move || zstd::decode_all(blob.as_slice()))
            .await
            .map_err(|e| CodecError::Worker(e.to_string()))?
            .map_err(|e| CodecError::Decompress(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| CodecError::Serialize(e.to_string()))
    }
}

impl Default for ZstdPayloadCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadCodec for ZstdPayloadCodec {
    async fn compress(&self, value: &str) -> Result<Vec<u8>, CodecError> {
        self.compress_value(&value).await
    }

    async fn decompress(&self, blob: &[u8]) -> Result<String, CodecError> {
        self.decompress_value(blob).await
    }
}
