//! SQLite hot-tier store.
//!
//! Implements `HotStore` from `chatvault-core` using sqlx with the split
//! read/write pool: raw queries, private Row structs, rows_affected checks
//! for NotFound. External identifiers are hashed through the injected
//! [`IdentityHasher`] before they ever reach a bind parameter.

use chatvault_core::codec::IdentityHasher;
use chatvault_core::repository::HotStore;
use chatvault_types::chat::{ArchiveState, Chat, ChatRole, ChatSummary, Message};
use chatvault_types::error::StoreError;
use chatvault_types::user::User;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_sqlx_error, parse_datetime, parse_uuid};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        telegram_id_hash TEXT NOT NULL UNIQUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS chats (
        chat_id TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        model TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        archive_state TEXT NOT NULL DEFAULT 'active'
            CHECK (archive_state IN ('active', 'migrating'))
    )"#,
    r#"CREATE TABLE IF NOT EXISTS messages (
        message_id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL REFERENCES chats(chat_id) ON DELETE CASCADE,
        role TEXT NOT NULL CHECK (role IN ('user', 'assistant', 'system')),
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        archive_state TEXT NOT NULL DEFAULT 'active'
            CHECK (archive_state IN ('active', 'migrating'))
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages(chat_id)"#,
];

/// SQLite-backed implementation of `HotStore`.
#[derive(Clone)]
pub struct SqliteHotStore<H: IdentityHasher> {
    pool: DatabasePool,
    hasher: H,
}

impl<H: IdentityHasher> SqliteHotStore<H> {
    /// Create a new store over the hot-tier pool with the given hasher.
    pub fn new(pool: DatabasePool, hasher: H) -> Self {
        Self { pool, hasher }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatRow {
    chat_id: String,
    user_id: i64,
    title: String,
    created_at: String,
    model: String,
    is_active: bool,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            chat_id: row.try_get("chat_id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
            model: row.try_get("model")?,
            is_active: row.try_get("is_active")?,
        })
    }

    fn into_chat(self) -> Result<Chat, StoreError> {
        Ok(Chat {
            chat_id: parse_uuid(&self.chat_id, "chat_id")?,
            user_id: self.user_id,
            title: self.title,
            model: self.model,
            created_at: parse_datetime(&self.created_at)?,
            is_active: self.is_active,
        })
    }
}

struct MessageRow {
    message_id: String,
    chat_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            message_id: row.try_get("message_id")?,
            chat_id: row.try_get("chat_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, StoreError> {
        let role: ChatRole = self
            .role
            .parse()
            .map_err(|e: String| StoreError::Query(e))?;

        Ok(Message {
            message_id: parse_uuid(&self.message_id, "message_id")?,
            chat_id: parse_uuid(&self.chat_id, "chat_id")?,
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// HotStore implementation
// ---------------------------------------------------------------------------

impl<H: IdentityHasher> HotStore for SqliteHotStore<H> {
    async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool.writer)
                .await
                .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    async fn register_user(&self, telegram_id: i64) -> Result<User, StoreError> {
        let hash = self.hasher.hash(&telegram_id.to_string());

        let result = sqlx::query("INSERT INTO users (telegram_id_hash) VALUES (?)")
            .bind(&hash)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| match map_sqlx_error(e) {
                StoreError::AlreadyExists(_) => {
                    StoreError::AlreadyExists("user already registered".to_string())
                }
                other => other,
            })?;

        Ok(User {
            id: result.last_insert_rowid(),
            telegram_id_hash: hash,
        })
    }

    async fn get_user(&self, telegram_id: i64) -> Result<User, StoreError> {
        let hash = self.hasher.hash(&telegram_id.to_string());

        let row = sqlx::query("SELECT id FROM users WHERE telegram_id_hash = ?")
            .bind(&hash)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(User {
                id: row.try_get("id").map_err(|e| StoreError::Query(e.to_string()))?,
                telegram_id_hash: hash,
            }),
            None => Err(StoreError::NotFound("user not registered".to_string())),
        }
    }

    async fn add_chat(
        &self,
        chat_id: Uuid,
        user_id: i64,
        title: &str,
        model: &str,
    ) -> Result<Chat, StoreError> {
        let created_at = Utc::now();

        sqlx::query(
            r#"INSERT INTO chats (chat_id, user_id, title, created_at, model, is_active)
               VALUES (?, ?, ?, ?, ?, 1)"#,
        )
        .bind(chat_id.to_string())
        .bind(user_id)
        .bind(title)
        .bind(format_datetime(&created_at))
        .bind(model)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            StoreError::AlreadyExists(_) => {
                StoreError::AlreadyExists(format!("chat {chat_id}"))
            }
            StoreError::NotFound(_) => StoreError::NotFound(format!("user {user_id}")),
            other => other,
        })?;

        Ok(Chat {
            chat_id,
            user_id,
            title: title.to_string(),
            model: model.to_string(),
            created_at,
            is_active: true,
        })
    }

    async fn get_chat_by_id(&self, chat_id: &Uuid) -> Result<Option<Chat>, StoreError> {
        let row = sqlx::query("SELECT * FROM chats WHERE chat_id = ? AND archive_state = 'active'")
            .bind(chat_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => {
                let chat_row =
                    ChatRow::from_row(&row).map_err(|e| StoreError::Query(e.to_string()))?;
                Ok(Some(chat_row.into_chat()?))
            }
            None => Ok(None),
        }
    }

    async fn get_chat_title(&self, chat_id: &Uuid) -> Result<String, StoreError> {
        let row = sqlx::query(
            "SELECT title FROM chats WHERE chat_id = ? AND archive_state = 'active'",
        )
        .bind(chat_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => row
                .try_get("title")
                .map_err(|e| StoreError::Query(e.to_string())),
            None => Err(StoreError::NotFound(format!("chat {chat_id}"))),
        }
    }

    async fn get_all_chats(&self, user_id: i64) -> Result<Vec<ChatSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT chat_id, title FROM chats WHERE user_id = ? AND archive_state = 'active'",
        )
        .bind(user_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in &rows {
            let chat_id: String = row
                .try_get("chat_id")
                .map_err(|e| StoreError::Query(e.to_string()))?;
            let title: String = row
                .try_get("title")
                .map_err(|e| StoreError::Query(e.to_string()))?;
            chats.push(ChatSummary {
                chat_id: parse_uuid(&chat_id, "chat_id")?,
                title,
            });
        }

        Ok(chats)
    }

    async fn delete_chat(&self, chat_id: &Uuid) -> Result<(), StoreError> {
        // ON DELETE CASCADE removes the chat's messages in the same statement.
        let result =
            sqlx::query("DELETE FROM chats WHERE chat_id = ? AND archive_state = 'active'")
                .bind(chat_id.to_string())
                .execute(&self.pool.writer)
                .await
                .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("chat {chat_id}")));
        }

        Ok(())
    }

    async fn add_message(
        &self,
        message_id: Uuid,
        chat_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> Result<Message, StoreError> {
        let created_at = Utc::now();

        // The parent-state check and the insert share one writer
        // transaction, so an add can never slip between a migration's
        // snapshot and its hot delete.
        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let state: Option<(String,)> =
            sqlx::query_as("SELECT archive_state FROM chats WHERE chat_id = ?")
                .bind(chat_id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        match state {
            Some((state,)) if state == ArchiveState::Active.to_string() => {}
            _ => {
                return Err(StoreError::NotFound(format!(
                    "chat {chat_id} is absent or archived"
                )));
            }
        }

        sqlx::query(
            r#"INSERT INTO messages (message_id, chat_id, role, content, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(message_id.to_string())
        .bind(chat_id.to_string())
        .bind(role.to_string())
        .bind(content)
        .bind(format_datetime(&created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            StoreError::AlreadyExists(_) => {
                StoreError::AlreadyExists(format!("message {message_id}"))
            }
            other => other,
        })?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Message {
            message_id,
            chat_id,
            role,
            content: content.to_string(),
            created_at,
        })
    }

    async fn get_messages(&self, chat_id: &Uuid) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT * FROM messages
               WHERE chat_id = ? AND archive_state = 'active'
               ORDER BY created_at ASC"#,
        )
        .bind(chat_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row =
                MessageRow::from_row(row).map_err(|e| StoreError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        Ok(messages)
    }

    async fn edit_message(
        &self,
        chat_id: &Uuid,
        message_id: &Uuid,
        content: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"UPDATE messages SET content = ?
               WHERE message_id = ? AND chat_id = ? AND archive_state = 'active'"#,
        )
        .bind(content)
        .bind(message_id.to_string())
        .bind(chat_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("message {message_id}")));
        }

        Ok(())
    }

    async fn delete_message(&self, message_id: &Uuid, chat_id: &Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"DELETE FROM messages
               WHERE message_id = ? AND chat_id = ? AND archive_state = 'active'"#,
        )
        .bind(message_id.to_string())
        .bind(chat_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("message {message_id}")));
        }

        Ok(())
    }

    // --- Migration support ---

    async fn begin_chat_migration(
        &self,
        chat_id: &Uuid,
    ) -> Result<(Chat, Vec<Message>), StoreError> {
        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let flipped = sqlx::query(
            r#"UPDATE chats SET archive_state = 'migrating'
               WHERE chat_id = ? AND archive_state = 'active'"#,
        )
        .bind(chat_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if flipped.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("chat {chat_id}")));
        }

        // A message left 'migrating' by a crashed standalone migration has
        // its own cold-tier fate; archiving around it could lose it on the
        // cascade delete. Resolve via recovery first.
        let (stuck,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages WHERE chat_id = ? AND archive_state = 'migrating'",
        )
        .bind(chat_id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if stuck > 0 {
            return Err(StoreError::Unavailable(format!(
                "chat {chat_id} has {stuck} message(s) mid-migration; run recovery"
            )));
        }

        sqlx::query("UPDATE messages SET archive_state = 'migrating' WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let chat_row = sqlx::query("SELECT * FROM chats WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let chat = ChatRow::from_row(&chat_row)
            .map_err(|e| StoreError::Query(e.to_string()))?
            .into_chat()?;

        let message_rows =
            sqlx::query("SELECT * FROM messages WHERE chat_id = ? ORDER BY created_at ASC")
                .bind(chat_id.to_string())
                .fetch_all(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        let mut messages = Vec::with_capacity(message_rows.len());
        for row in &message_rows {
            let msg_row =
                MessageRow::from_row(row).map_err(|e| StoreError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok((chat, messages))
    }

    async fn abort_chat_migration(&self, chat_id: &Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"UPDATE chats SET archive_state = 'active'
               WHERE chat_id = ? AND archive_state = 'migrating'"#,
        )
        .bind(chat_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("chat {chat_id} not migrating")));
        }

        sqlx::query("UPDATE messages SET archive_state = 'active' WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn finish_chat_migration(&self, chat_id: &Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM chats WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("chat {chat_id}")));
        }

        Ok(())
    }

    async fn mark_message_migrating(
        &self,
        message_id: &Uuid,
        chat_id: &Uuid,
    ) -> Result<Message, StoreError> {
        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"UPDATE messages SET archive_state = 'migrating'
               WHERE message_id = ? AND chat_id = ? AND archive_state = 'active'"#,
        )
        .bind(message_id.to_string())
        .bind(chat_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("message {message_id}")));
        }

        let row = sqlx::query("SELECT * FROM messages WHERE message_id = ?")
            .bind(message_id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let message = MessageRow::from_row(&row)
            .map_err(|e| StoreError::Query(e.to_string()))?
            .into_message()?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(message)
    }

    async fn abort_message_migration(
        &self,
        message_id: &Uuid,
        chat_id: &Uuid,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"UPDATE messages SET archive_state = 'active'
               WHERE message_id = ? AND chat_id = ? AND archive_state = 'migrating'"#,
        )
        .bind(message_id.to_string())
        .bind(chat_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "message {message_id} not migrating"
            )));
        }

        Ok(())
    }

    async fn finish_message_migration(
        &self,
        message_id: &Uuid,
        chat_id: &Uuid,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE message_id = ? AND chat_id = ?")
            .bind(message_id.to_string())
            .bind(chat_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("message {message_id}")));
        }

        Ok(())
    }

    async fn list_migrating_chats(&self) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query("SELECT chat_id FROM chats WHERE archive_state = 'migrating'")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row
                .try_get("chat_id")
                .map_err(|e| StoreError::Query(e.to_string()))?;
            ids.push(parse_uuid(&id, "chat_id")?);
        }

        Ok(ids)
    }

    async fn list_migrating_messages(&self) -> Result<Vec<(Uuid, Uuid)>, StoreError> {
        // Messages under a migrating chat are resolved with the chat itself.
        let rows = sqlx::query(
            r#"SELECT m.message_id, m.chat_id FROM messages m
               JOIN chats c ON c.chat_id = m.chat_id
               WHERE m.archive_state = 'migrating' AND c.archive_state = 'active'"#,
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let mut pairs = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_id: String = row
                .try_get("message_id")
                .map_err(|e| StoreError::Query(e.to_string()))?;
            let chat_id: String = row
                .try_get("chat_id")
                .map_err(|e| StoreError::Query(e.to_string()))?;
            pairs.push((
                parse_uuid(&message_id, "message_id")?,
                parse_uuid(&chat_id, "chat_id")?,
            ));
        }

        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Sha256IdentityHasher;

    async fn test_store() -> (SqliteHotStore<Sha256IdentityHasher>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("hot.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = DatabasePool::connect(&url).await.unwrap();
        let store = SqliteHotStore::new(pool, Sha256IdentityHasher::new());
        store.init_schema().await.unwrap();
        (store, dir)
    }

    async fn seeded_chat(store: &SqliteHotStore<Sha256IdentityHasher>) -> (i64, Uuid) {
        let user = store.register_user(42).await.unwrap();
        let chat_id = Uuid::now_v7();
        store
            .add_chat(chat_id, user.id, "Test", "modelA")
            .await
            .unwrap();
        (user.id, chat_id)
    }

    #[tokio::test]
    async fn test_init_schema_idempotent() {
        let (store, _dir) = test_store().await;
        store.init_schema().await.unwrap();
        store.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_register_user_stores_only_hash() {
        let (store, _dir) = test_store().await;
        let user = store.register_user(42).await.unwrap();

        assert_eq!(user.telegram_id_hash.len(), 64);
        assert_ne!(user.telegram_id_hash, "42");

        let found = store.get_user(42).await.unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.telegram_id_hash, user.telegram_id_hash);
    }

    #[tokio::test]
    async fn test_register_user_duplicate() {
        let (store, _dir) = test_store().await;
        store.register_user(42).await.unwrap();

        let err = store.register_user(42).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_get_user_not_registered() {
        let (store, _dir) = test_store().await;
        let err = store.get_user(7).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let (store, _dir) = test_store().await;
        let (user_id, chat_id) = seeded_chat(&store).await;

        let chat = store.get_chat_by_id(&chat_id).await.unwrap().unwrap();
        assert_eq!(chat.chat_id, chat_id);
        assert_eq!(chat.user_id, user_id);
        assert_eq!(chat.title, "Test");
        assert_eq!(chat.model, "modelA");
        assert!(chat.is_active);
    }

    #[tokio::test]
    async fn test_add_chat_duplicate_and_unknown_user() {
        let (store, _dir) = test_store().await;
        let (user_id, chat_id) = seeded_chat(&store).await;

        let err = store
            .add_chat(chat_id, user_id, "Again", "modelA")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let err = store
            .add_chat(Uuid::now_v7(), 9999, "Orphan", "modelA")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_chat_title() {
        let (store, _dir) = test_store().await;
        let (_, chat_id) = seeded_chat(&store).await;

        let title = store.get_chat_title(&chat_id).await.unwrap();
        assert_eq!(title, "Test");

        let err = store.get_chat_title(&Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        // Hidden along with the rest of the chat while migrating.
        store.begin_chat_migration(&chat_id).await.unwrap();
        let err = store.get_chat_title(&chat_id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_all_chats() {
        let (store, _dir) = test_store().await;
        let user = store.register_user(1).await.unwrap();

        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        store.add_chat(a, user.id, "A", "m").await.unwrap();
        store.add_chat(b, user.id, "B", "m").await.unwrap();

        let mut chats = store.get_all_chats(user.id).await.unwrap();
        chats.sort_by(|x, y| x.title.cmp(&y.title));
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].chat_id, a);
        assert_eq!(chats[1].title, "B");
    }

    #[tokio::test]
    async fn test_delete_chat_cascades_messages() {
        let (store, _dir) = test_store().await;
        let (_, chat_id) = seeded_chat(&store).await;

        store
            .add_message(Uuid::now_v7(), chat_id, ChatRole::User, "hello")
            .await
            .unwrap();

        store.delete_chat(&chat_id).await.unwrap();

        assert!(store.get_chat_by_id(&chat_id).await.unwrap().is_none());
        assert!(store.get_messages(&chat_id).await.unwrap().is_empty());

        let err = store.delete_chat(&chat_id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_message_lifecycle() {
        let (store, _dir) = test_store().await;
        let (_, chat_id) = seeded_chat(&store).await;

        let m1 = Uuid::now_v7();
        store
            .add_message(m1, chat_id, ChatRole::User, "hello")
            .await
            .unwrap();
        store
            .add_message(Uuid::now_v7(), chat_id, ChatRole::Assistant, "hi there")
            .await
            .unwrap();

        let messages = store.get_messages(&chat_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "hello");

        store.edit_message(&chat_id, &m1, "hello, edited").await.unwrap();
        let messages = store.get_messages(&chat_id).await.unwrap();
        assert_eq!(messages[0].content, "hello, edited");

        store.delete_message(&m1, &chat_id).await.unwrap();
        assert_eq!(store.get_messages(&chat_id).await.unwrap().len(), 1);

        let err = store.delete_message(&m1, &chat_id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store
            .edit_message(&chat_id, &m1, "gone")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_message_duplicate_id() {
        let (store, _dir) = test_store().await;
        let (_, chat_id) = seeded_chat(&store).await;

        let m1 = Uuid::now_v7();
        store
            .add_message(m1, chat_id, ChatRole::User, "one")
            .await
            .unwrap();
        let err = store
            .add_message(m1, chat_id, ChatRole::User, "two")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_add_message_absent_chat() {
        let (store, _dir) = test_store().await;
        let err = store
            .add_message(Uuid::now_v7(), Uuid::now_v7(), ChatRole::User, "lost?")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_begin_chat_migration_hides_chat() {
        let (store, _dir) = test_store().await;
        let (user_id, chat_id) = seeded_chat(&store).await;
        store
            .add_message(Uuid::now_v7(), chat_id, ChatRole::User, "hello")
            .await
            .unwrap();

        let (chat, messages) = store.begin_chat_migration(&chat_id).await.unwrap();
        assert_eq!(chat.chat_id, chat_id);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello");

        // Invisible to every normal operation while migrating.
        assert!(store.get_chat_by_id(&chat_id).await.unwrap().is_none());
        assert!(store.get_all_chats(user_id).await.unwrap().is_empty());
        assert!(store.get_messages(&chat_id).await.unwrap().is_empty());
        let err = store
            .add_message(Uuid::now_v7(), chat_id, ChatRole::User, "late")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        // A second begin sees a phantom.
        let err = store.begin_chat_migration(&chat_id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_abort_chat_migration_restores_visibility() {
        let (store, _dir) = test_store().await;
        let (_, chat_id) = seeded_chat(&store).await;
        store
            .add_message(Uuid::now_v7(), chat_id, ChatRole::User, "hello")
            .await
            .unwrap();

        store.begin_chat_migration(&chat_id).await.unwrap();
        store.abort_chat_migration(&chat_id).await.unwrap();

        assert!(store.get_chat_by_id(&chat_id).await.unwrap().is_some());
        assert_eq!(store.get_messages(&chat_id).await.unwrap().len(), 1);
        assert!(store.list_migrating_chats().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finish_chat_migration_deletes_rows() {
        let (store, _dir) = test_store().await;
        let (_, chat_id) = seeded_chat(&store).await;
        store
            .add_message(Uuid::now_v7(), chat_id, ChatRole::User, "hello")
            .await
            .unwrap();

        store.begin_chat_migration(&chat_id).await.unwrap();
        store.finish_chat_migration(&chat_id).await.unwrap();

        assert!(store.get_chat_by_id(&chat_id).await.unwrap().is_none());
        assert!(store.list_migrating_chats().await.unwrap().is_empty());
        let err = store.finish_chat_migration(&chat_id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_begin_chat_migration_refuses_stuck_message() {
        let (store, _dir) = test_store().await;
        let (_, chat_id) = seeded_chat(&store).await;
        let m1 = Uuid::now_v7();
        store
            .add_message(m1, chat_id, ChatRole::User, "hello")
            .await
            .unwrap();

        store.mark_message_migrating(&m1, &chat_id).await.unwrap();

        let err = store.begin_chat_migration(&chat_id).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        // The refused begin must not leave the chat hidden.
        assert!(store.get_chat_by_id(&chat_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_message_migration_marking() {
        let (store, _dir) = test_store().await;
        let (_, chat_id) = seeded_chat(&store).await;
        let m1 = Uuid::now_v7();
        store
            .add_message(m1, chat_id, ChatRole::User, "hello")
            .await
            .unwrap();

        let snapshot = store.mark_message_migrating(&m1, &chat_id).await.unwrap();
        assert_eq!(snapshot.content, "hello");
        assert!(store.get_messages(&chat_id).await.unwrap().is_empty());
        assert_eq!(
            store.list_migrating_messages().await.unwrap(),
            vec![(m1, chat_id)]
        );

        // Marking twice is a phantom.
        let err = store.mark_message_migrating(&m1, &chat_id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store.abort_message_migration(&m1, &chat_id).await.unwrap();
        assert_eq!(store.get_messages(&chat_id).await.unwrap().len(), 1);

        store.mark_message_migrating(&m1, &chat_id).await.unwrap();
        store.finish_message_migration(&m1, &chat_id).await.unwrap();
        assert!(store.list_migrating_messages().await.unwrap().is_empty());
        assert!(store.get_messages(&chat_id).await.unwrap().is_empty());
    }
}
