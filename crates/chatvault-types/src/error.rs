//! Error taxonomy for the storage engine.
//!
//! Low-level driver failures are translated at the store boundary into
//! [`StoreError`]. `Unavailable` is the only retryable kind; `AlreadyExists`
//! and `NotFound` surface directly to the caller, and `MigrationFailed` is
//! never swallowed because it implies a possible inconsistency between tiers.

use thiserror::Error;

/// Which half of the delete-then-insert migration sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    /// Marking the hot-tier row and taking its snapshot.
    Snapshot,
    /// Writing the archived copy into the cold tier.
    ColdWrite,
    /// Deleting the hot-tier row after the cold write was confirmed.
    HotDelete,
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationPhase::Snapshot => write!(f, "hot snapshot"),
            MigrationPhase::ColdWrite => write!(f, "cold write"),
            MigrationPhase::HotDelete => write!(f, "hot delete"),
        }
    }
}

/// Domain error for all store and migration operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness violation on a user/chat/message insert.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Lookup, delete, or edit targeting an absent row.
    #[error("not found: {0}")]
    NotFound(String),

    /// Connection or transport failure to a store; candidate for retry
    /// with backoff.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Non-transient driver or row-decoding fault.
    #[error("query error: {0}")]
    Query(String),

    /// Failure during the migration workflow, identifying which half of
    /// the sequence failed and wrapping the underlying cause.
    #[error("migration failed during {phase}: {source}")]
    MigrationFailed {
        phase: MigrationPhase,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Wrap an error as a migration failure in the given phase.
    pub fn migration(phase: MigrationPhase, source: StoreError) -> Self {
        StoreError::MigrationFailed {
            phase,
            source: Box::new(source),
        }
    }

    /// Whether a caller may retry the operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::MigrationFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Errors from the hashing/compression codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("compression error: {0}")]
    Compress(String),

    #[error("decompression error: {0}")]
    Decompress(String),

    #[error("codec worker failed: {0}")]
    Worker(String),
}

impl From<CodecError> for StoreError {
    fn from(err: CodecError) -> Self {
        StoreError::Query(err.to_string())
    }
}
