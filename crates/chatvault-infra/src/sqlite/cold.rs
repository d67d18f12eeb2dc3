//! SQLite cold-tier store.
//!
//! Append-mostly archive. Chat rows are stored with their field values
//! unmodified (and no foreign key to any user table); message `role` and
//! `content` are each compressed into their own byte column through the
//! injected [`PayloadCodec`], so the archive never holds plaintext bodies.

use chatvault_core::codec::PayloadCodec;
use chatvault_core::repository::ColdStore;
use chatvault_types::chat::{Chat, ChatRole, ColdChat, ColdMessage, Message};
use chatvault_types::error::StoreError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_sqlx_error, parse_datetime, parse_uuid};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS cold_storage_chats (
        chat_id TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        model TEXT NOT NULL,
        is_active INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cold_storage_messages (
        message_id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL REFERENCES cold_storage_chats(chat_id) ON DELETE CASCADE,
        role_compressed BLOB NOT NULL,
        content_compressed BLOB NOT NULL,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_cold_messages_chat_id
        ON cold_storage_messages(chat_id)"#,
];

/// SQLite-backed implementation of `ColdStore`.
#[derive(Clone)]
pub struct SqliteColdStore<P: PayloadCodec> {
    pool: DatabasePool,
    codec: P,
}

impl<P: PayloadCodec> SqliteColdStore<P> {
    /// Create a new store over the cold-tier pool with the given codec.
    pub fn new(pool: DatabasePool, codec: P) -> Self {
        Self { pool, codec }
    }

    async fn compress_message(&self, message: &Message) -> Result<(Vec<u8>, Vec<u8>), StoreError> {
        let role = self.codec.compress(&message.role.to_string()).await?;
        let content = self.codec.compress(&message.content).await?;
        Ok((role, content))
    }

    /// Fetch an archived message row as stored, compressed fields included.
    pub async fn get_cold_message(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<ColdMessage>, StoreError> {
        let row = sqlx::query("SELECT * FROM cold_storage_messages WHERE message_id = ?")
            .bind(message_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let message_id_raw: String = row
            .try_get("message_id")
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let chat_id: String = row
            .try_get("chat_id")
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(Some(ColdMessage {
            message_id: parse_uuid(&message_id_raw, "message_id")?,
            chat_id: parse_uuid(&chat_id, "chat_id")?,
            role_compressed: row
                .try_get("role_compressed")
                .map_err(|e| StoreError::Query(e.to_string()))?,
            content_compressed: row
                .try_get("content_compressed")
                .map_err(|e| StoreError::Query(e.to_string()))?,
            created_at: parse_datetime(&created_at)?,
        }))
    }
}

impl<P: PayloadCodec> ColdStore for SqliteColdStore<P> {
    async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool.writer)
                .await
                .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    async fn archive_chat(&self, chat: &Chat, messages: &[Message]) -> Result<(), StoreError> {
        // Compress everything before opening the transaction; the writer
        // connection is not held across codec work.
        let mut compressed = Vec::with_capacity(messages.len());
        for message in messages {
            compressed.push(self.compress_message(message).await?);
        }

        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"INSERT INTO cold_storage_chats (chat_id, user_id, title, created_at, model, is_active)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(chat.chat_id.to_string())
        .bind(chat.user_id)
        .bind(&chat.title)
        .bind(format_datetime(&chat.created_at))
        .bind(&chat.model)
        .bind(chat.is_active)
        .execute(&mut *tx)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            StoreError::AlreadyExists(_) => {
                StoreError::AlreadyExists(format!("chat {} already archived", chat.chat_id))
            }
            other => other,
        })?;

        for (message, (role_compressed, content_compressed)) in messages.iter().zip(&compressed) {
            sqlx::query(
                r#"INSERT INTO cold_storage_messages
                   (message_id, chat_id, role_compressed, content_compressed, created_at)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(message.message_id.to_string())
            .bind(message.chat_id.to_string())
            .bind(role_compressed)
            .bind(content_compressed)
            .bind(format_datetime(&message.created_at))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn archive_message(&self, message: &Message) -> Result<(), StoreError> {
        let (role_compressed, content_compressed) = self.compress_message(message).await?;

        sqlx::query(
            r#"INSERT INTO cold_storage_messages
               (message_id, chat_id, role_compressed, content_compressed, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(message.message_id.to_string())
        .bind(message.chat_id.to_string())
        .bind(role_compressed)
        .bind(content_compressed)
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            StoreError::NotFound(_) => StoreError::NotFound(format!(
                "chat {} not archived; archive the chat first",
                message.chat_id
            )),
            StoreError::AlreadyExists(_) => StoreError::AlreadyExists(format!(
                "message {} already archived",
                message.message_id
            )),
            other => other,
        })?;

        Ok(())
    }

    async fn chat_exists(&self, chat_id: &Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM cold_storage_chats WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.is_some())
    }

    async fn message_exists(&self, message_id: &Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM cold_storage_messages WHERE message_id = ?")
            .bind(message_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.is_some())
    }

    async fn get_chat(&self, chat_id: &Uuid) -> Result<Option<ColdChat>, StoreError> {
        let row = sqlx::query("SELECT * FROM cold_storage_chats WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let chat_id: String = row
            .try_get("chat_id")
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(Some(ColdChat {
            chat_id: parse_uuid(&chat_id, "chat_id")?,
            user_id: row
                .try_get("user_id")
                .map_err(|e| StoreError::Query(e.to_string()))?,
            title: row
                .try_get("title")
                .map_err(|e| StoreError::Query(e.to_string()))?,
            model: row
                .try_get("model")
                .map_err(|e| StoreError::Query(e.to_string()))?,
            created_at: parse_datetime(&created_at)?,
            is_active: row
                .try_get("is_active")
                .map_err(|e| StoreError::Query(e.to_string()))?,
        }))
    }

    async fn get_message(&self, message_id: &Uuid) -> Result<Option<Message>, StoreError> {
        let Some(cold) = self.get_cold_message(message_id).await? else {
            return Ok(None);
        };

        let role_text = self.codec.decompress(&cold.role_compressed).await?;
        let role: ChatRole = role_text
            .parse()
            .map_err(|e: String| StoreError::Query(e))?;
        let content = self.codec.decompress(&cold.content_compressed).await?;

        Ok(Some(Message {
            message_id: cold.message_id,
            chat_id: cold.chat_id,
            role,
            content,
            created_at: cold.created_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ZstdPayloadCodec;
    use chrono::Utc;

    async fn test_store() -> (SqliteColdStore<ZstdPayloadCodec>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cold.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = DatabasePool::connect(&url).await.unwrap();
        let store = SqliteColdStore::new(pool, ZstdPayloadCodec::new());
        store.init_schema().await.unwrap();
        (store, dir)
    }

    fn make_chat() -> Chat {
        Chat {
            chat_id: Uuid::now_v7(),
            user_id: 1,
            title: "Archived talk".to_string(),
            model: "modelA".to_string(),
            created_at: Utc::now(),
            is_active: true,
        }
    }

    fn make_message(chat_id: Uuid, role: ChatRole, content: &str) -> Message {
        Message {
            message_id: Uuid::now_v7(),
            chat_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_init_schema_idempotent() {
        let (store, _dir) = test_store().await;
        store.init_schema().await.unwrap();
        store.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_archive_chat_preserves_fields() {
        let (store, _dir) = test_store().await;
        let chat = make_chat();

        store.archive_chat(&chat, &[]).await.unwrap();

        let cold = store.get_chat(&chat.chat_id).await.unwrap().unwrap();
        assert_eq!(cold.chat_id, chat.chat_id);
        assert_eq!(cold.user_id, chat.user_id);
        assert_eq!(cold.title, chat.title);
        assert_eq!(cold.model, chat.model);
        assert_eq!(cold.is_active, chat.is_active);
        assert_eq!(
            cold.created_at.timestamp_millis(),
            chat.created_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_archive_chat_with_messages_round_trips() {
        let (store, _dir) = test_store().await;
        let chat = make_chat();
        let m1 = make_message(chat.chat_id, ChatRole::User, "hello");
        let m2 = make_message(chat.chat_id, ChatRole::Assistant, "hi there");

        store
            .archive_chat(&chat, &[m1.clone(), m2.clone()])
            .await
            .unwrap();

        assert!(store.message_exists(&m1.message_id).await.unwrap());
        let back = store.get_message(&m1.message_id).await.unwrap().unwrap();
        assert_eq!(back.role, ChatRole::User);
        assert_eq!(back.content, "hello");
        assert_eq!(back.chat_id, chat.chat_id);
        let back = store.get_message(&m2.message_id).await.unwrap().unwrap();
        assert_eq!(back.role, ChatRole::Assistant);
        assert_eq!(back.content, "hi there");
    }

    #[tokio::test]
    async fn test_archive_stores_no_plaintext() {
        let (store, _dir) = test_store().await;
        let chat = make_chat();
        let message = make_message(chat.chat_id, ChatRole::User, "a very private remark");
        store.archive_chat(&chat, &[message.clone()]).await.unwrap();

        let cold = store
            .get_cold_message(&message.message_id)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(cold.role_compressed.as_slice(), b"user".as_slice());
        assert_ne!(
            cold.content_compressed.as_slice(),
            b"a very private remark".as_slice()
        );
        assert_eq!(cold.chat_id, chat.chat_id);
    }

    #[tokio::test]
    async fn test_archive_chat_twice_conflicts() {
        let (store, _dir) = test_store().await;
        let chat = make_chat();
        store.archive_chat(&chat, &[]).await.unwrap();

        let err = store.archive_chat(&chat, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_archive_message_requires_archived_chat() {
        let (store, _dir) = test_store().await;
        let message = make_message(Uuid::now_v7(), ChatRole::User, "orphan");

        let err = store.archive_message(&message).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_archive_message_into_archived_chat() {
        let (store, _dir) = test_store().await;
        let chat = make_chat();
        store.archive_chat(&chat, &[]).await.unwrap();

        let message = make_message(chat.chat_id, ChatRole::System, "you are helpful");
        store.archive_message(&message).await.unwrap();

        let back = store
            .get_message(&message.message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(back.role, ChatRole::System);
        assert_eq!(back.content, "you are helpful");
    }

    #[tokio::test]
    async fn test_probes_on_absent_rows() {
        let (store, _dir) = test_store().await;
        assert!(!store.chat_exists(&Uuid::now_v7()).await.unwrap());
        assert!(!store.message_exists(&Uuid::now_v7()).await.unwrap());
        assert!(store.get_chat(&Uuid::now_v7()).await.unwrap().is_none());
        assert!(store.get_message(&Uuid::now_v7()).await.unwrap().is_none());
    }
}
