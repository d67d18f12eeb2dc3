//! HotStore trait definition.
//!
//! Authoritative CRUD over active users, chats, and messages, plus the
//! migration support surface used by the orchestrator: marking rows
//! `migrating`, taking snapshots, and completing or rolling back a
//! relocation. Uses native async fn in traits (RPITIT, Rust 2024 edition).

use chatvault_types::chat::{Chat, ChatRole, ChatSummary, Message};
use chatvault_types::error::StoreError;
use chatvault_types::user::User;
use uuid::Uuid;

/// Repository trait for the hot (primary) tier.
///
/// Rows with `archive_state = 'migrating'` are invisible to every normal
/// operation here; only the `*_migration` methods touch them.
pub trait HotStore: Send + Sync {
    /// Idempotently ensure the hot-tier tables exist.
    fn init_schema(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Register a user by external identifier; only the hash is stored.
    ///
    /// Returns `AlreadyExists` if the same external identity is already
    /// registered (digest collision on the unique column).
    fn register_user(
        &self,
        telegram_id: i64,
    ) -> impl std::future::Future<Output = Result<User, StoreError>> + Send;

    /// Look a user up by external identifier; `NotFound` if absent.
    fn get_user(
        &self,
        telegram_id: i64,
    ) -> impl std::future::Future<Output = Result<User, StoreError>> + Send;

    /// Insert a chat owned by `user_id`. Duplicate `chat_id` is
    /// `AlreadyExists`; an unknown owner is `NotFound`.
    fn add_chat(
        &self,
        chat_id: Uuid,
        user_id: i64,
        title: &str,
        model: &str,
    ) -> impl std::future::Future<Output = Result<Chat, StoreError>> + Send;

    /// Fetch the full chat snapshot, or `None` if absent (or migrating).
    fn get_chat_by_id(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, StoreError>> + Send;

    /// Fetch only a chat's title; `NotFound` if absent (or migrating).
    fn get_chat_title(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<String, StoreError>> + Send;

    /// List `(chat_id, title)` for all of a user's chats. Order is not
    /// guaranteed.
    fn get_all_chats(
        &self,
        user_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSummary>, StoreError>> + Send;

    /// Delete a chat and, in the same transaction, all of its messages.
    /// `NotFound` when no row was removed.
    fn delete_chat(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Insert a message into an active chat.
    ///
    /// The insert is guarded: it succeeds only while the parent chat
    /// exists with `archive_state = 'active'`, otherwise `NotFound`. This
    /// is what keeps a racing add from being silently dropped by a
    /// concurrent migration.
    fn add_message(
        &self,
        message_id: Uuid,
        chat_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> impl std::future::Future<Output = Result<Message, StoreError>> + Send;

    /// List a chat's messages, ordered by creation time.
    fn get_messages(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, StoreError>> + Send;

    /// Replace a message's content in place; `NotFound` if no row matched.
    fn edit_message(
        &self,
        chat_id: &Uuid,
        message_id: &Uuid,
        content: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Remove a single message; `NotFound` if no row matched.
    fn delete_message(
        &self,
        message_id: &Uuid,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    // --- Migration support (orchestrator only) ---

    /// In one transaction: flip a chat and its messages to `migrating` and
    /// return the full snapshot. `NotFound` if the chat is absent or a
    /// migration is already in flight.
    fn begin_chat_migration(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(Chat, Vec<Message>), StoreError>> + Send;

    /// Roll a chat (and its messages) back to `active` after a failed
    /// cold write.
    fn abort_chat_migration(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a migrated chat (cascading its messages) after the cold
    /// write is confirmed. `NotFound` if the row is already gone.
    fn finish_chat_migration(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Flip a single message to `migrating` and return its snapshot.
    /// `NotFound` if absent or already migrating.
    fn mark_message_migrating(
        &self,
        message_id: &Uuid,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Message, StoreError>> + Send;

    /// Roll a message back to `active`.
    fn abort_message_migration(
        &self,
        message_id: &Uuid,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a migrated message after the cold write is confirmed.
    fn finish_message_migration(
        &self,
        message_id: &Uuid,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Chats left in `migrating` by an interrupted workflow.
    fn list_migrating_chats(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Uuid>, StoreError>> + Send;

    /// `(message_id, chat_id)` pairs left in `migrating`, excluding
    /// messages whose whole chat is migrating.
    fn list_migrating_messages(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<(Uuid, Uuid)>, StoreError>> + Send;
}
