//! Codec traits: identifier pseudonymization and payload compression.
//!
//! Implementations live in `chatvault-infra` (SHA-256 hashing, zstd
//! compression). The hot store uses [`IdentityHasher`] so raw external
//! identifiers are never persisted; the cold store uses [`PayloadCodec`]
//! to fill the two compressed archive columns.

use chatvault_types::error::CodecError;

/// One-way, deterministic hashing of external identifiers.
///
/// The same input must always yield the same digest, and the digest must
/// be preimage-resistant (SHA-256 class).
pub trait IdentityHasher: Send + Sync {
    /// Hash a raw external identifier into its stored digest form.
    fn hash(&self, raw: &str) -> String;
}

/// Lossless compression of text payloads for the cold tier.
///
/// `decompress(compress(s)) == s` must hold for every string `s`.
/// Implementations dispatch the compression work off the request-handling
/// critical path (e.g. a blocking worker thread).
pub trait PayloadCodec: Send + Sync {
    /// Compress one text field into its stored byte form.
    fn compress(
        &self,
        value: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, CodecError>> + Send;

    /// Recover the original text from its stored byte form.
    fn decompress(
        &self,
        blob: &[u8],
    ) -> impl std::future::Future<Output = Result<String, CodecError>> + Send;
}
