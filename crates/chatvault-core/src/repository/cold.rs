//! ColdStore trait definition.
//!
//! Append-mostly archive: migration sinks plus the probes the recovery
//! sweep needs. Archived records are immutable; there is no update path.

use chatvault_types::chat::{Chat, ColdChat, Message};
use chatvault_types::error::StoreError;
use uuid::Uuid;

/// Repository trait for the cold (archival) tier.
///
/// Implementations own the payload codec and compress `role` and `content`
/// independently on the way in, so plaintext never reaches the archive.
pub trait ColdStore: Send + Sync {
    /// Idempotently ensure the archive tables exist. Repeated across
    /// process restarts; "already exists" is a success no-op.
    fn init_schema(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Archive a chat and all of its messages in one transaction. Chat
    /// field values are inserted unmodified; each message's `role` and
    /// `content` are compressed into their own byte columns.
    fn archive_chat(
        &self,
        chat: &Chat,
        messages: &[Message],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Archive a single message. The parent chat's archive row must
    /// already exist (foreign key).
    fn archive_message(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Whether a chat has been archived.
    fn chat_exists(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Whether a message has been archived.
    fn message_exists(
        &self,
        message_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Fetch an archived chat row.
    fn get_chat(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ColdChat>, StoreError>> + Send;

    /// Fetch an archived message, decompressed back to its plaintext view.
    fn get_message(
        &self,
        message_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Message>, StoreError>> + Send;
}
