//! Migration workflow between the hot and cold tiers.
//!
//! `MigrationService` relocates chats (with their messages) and individual
//! messages from the hot store into the cold store. The workflow is
//! mark-then-write-then-delete: hot rows are durably flipped to
//! `migrating` in the same transaction that snapshots them, the cold copy
//! is written, and only after the cold write is confirmed is the hot row
//! deleted. A failure before the cold write rolls the mark back; a failure
//! after it leaves the row `migrating` for [`MigrationService::recover`],
//! so no entity is ever unreachable in both tiers.

use std::sync::Arc;

use chatvault_types::chat::Message;
use chatvault_types::error::{MigrationPhase, StoreError};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::repository::{ColdStore, HotStore};

/// Outcome counts from a recovery sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Stalled chat migrations whose cold copy existed; hot rows deleted.
    pub chats_completed: usize,
    /// Stalled chat migrations with no cold copy; rows flipped back to active.
    pub chats_rolled_back: usize,
    pub messages_completed: usize,
    pub messages_rolled_back: usize,
}

/// Orchestrates hot-to-cold relocation.
///
/// Generic over [`HotStore`] and [`ColdStore`] so the workflow logic stays
/// independent of the backing engine. Operations touching the same
/// `chat_id` are serialized through an in-process per-chat mutex: a
/// migration and a concurrent migration (or recovery) of the same chat
/// never interleave.
pub struct MigrationService<H: HotStore, C: ColdStore> {
    hot: H,
    cold: C,
    chat_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl<H: HotStore, C: ColdStore> MigrationService<H, C> {
    /// Create a new migration service over the two tiers.
    pub fn new(hot: H, cold: C) -> Self {
        Self {
            hot,
            cold,
            chat_locks: DashMap::new(),
        }
    }

    /// Access the hot store.
    pub fn hot(&self) -> &H {
        &self.hot
    }

    /// Access the cold store.
    pub fn cold(&self) -> &C {
        &self.cold
    }

    fn chat_lock(&self, chat_id: &Uuid) -> Arc<Mutex<()>> {
        Arc::clone(
            &self
                .chat_locks
                .entry(*chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn release_chat_lock(&self, chat_id: &Uuid) {
        // Drop the registry entry once no workflow holds or awaits the
        // lock. The strong count is checked under the map entry, so a
        // concurrent chat_lock cannot clone the Arc mid-removal.
        self.chat_locks
            .remove_if(chat_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of per-chat lock entries currently retained.
    pub fn active_locks(&self) -> usize {
        self.chat_locks.len()
    }

    /// Relocate a chat and all of its messages into the cold tier.
    ///
    /// A phantom chat (already gone, or already mid-migration) is
    /// `NotFound`, never a silent success. Any failure in the workflow
    /// itself surfaces as `MigrationFailed` naming the phase.
    pub async fn migrate_chat(&self, chat_id: &Uuid) -> Result<(), StoreError> {
        let lock = self.chat_lock(chat_id);
        let result = {
            let _guard = lock.lock().await;
            self.migrate_chat_locked(chat_id).await
        };
        drop(lock);
        self.release_chat_lock(chat_id);
        result
    }

    async fn migrate_chat_locked(&self, chat_id: &Uuid) -> Result<(), StoreError> {
        let (chat, messages) = match self.hot.begin_chat_migration(chat_id).await {
            Ok(snapshot) => snapshot,
            Err(err @ StoreError::NotFound(_)) => return Err(err),
            Err(err) => return Err(StoreError::migration(MigrationPhase::Snapshot, err)),
        };

        if let Err(err) = self.cold.archive_chat(&chat, &messages).await {
            warn!(chat_id = %chat_id, error = %err, "cold write failed, rolling chat back");
            if let Err(abort_err) = self.hot.abort_chat_migration(chat_id).await {
                // Rows stay 'migrating'; the recovery sweep will flip them back.
                warn!(chat_id = %chat_id, error = %abort_err, "rollback failed");
            }
            return Err(StoreError::migration(MigrationPhase::ColdWrite, err));
        }

        if let Err(err) = self.hot.finish_chat_migration(chat_id).await {
            // Cold copy is durable; the hot rows stay hidden until recovery
            // finishes the delete.
            warn!(chat_id = %chat_id, error = %err, "hot delete failed after cold write");
            return Err(StoreError::migration(MigrationPhase::HotDelete, err));
        }

        info!(chat_id = %chat_id, messages = messages.len(), "chat migrated to cold tier");
        Ok(())
    }

    /// Relocate a single message into the cold tier.
    ///
    /// The snapshot actually archived is the one read from the hot store,
    /// not the caller's copy. The parent chat's archive row must already
    /// exist, or the cold write fails and the hot row is restored.
    pub async fn migrate_message(&self, message: &Message) -> Result<(), StoreError> {
        let lock = self.chat_lock(&message.chat_id);
        let result = {
            let _guard = lock.lock().await;
            self.migrate_message_locked(message).await
        };
        drop(lock);
        self.release_chat_lock(&message.chat_id);
        result
    }

    async fn migrate_message_locked(&self, message: &Message) -> Result<(), StoreError> {
        let snapshot = match self
            .hot
            .mark_message_migrating(&message.message_id, &message.chat_id)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(err @ StoreError::NotFound(_)) => return Err(err),
            Err(err) => return Err(StoreError::migration(MigrationPhase::Snapshot, err)),
        };

        if let Err(err) = self.cold.archive_message(&snapshot).await {
            warn!(message_id = %message.message_id, error = %err, "cold write failed, rolling message back");
            if let Err(abort_err) = self
                .hot
                .abort_message_migration(&message.message_id, &message.chat_id)
                .await
            {
                warn!(message_id = %message.message_id, error = %abort_err, "rollback failed");
            }
            return Err(StoreError::migration(MigrationPhase::ColdWrite, err));
        }

        if let Err(err) = self
            .hot
            .finish_message_migration(&message.message_id, &message.chat_id)
            .await
        {
            warn!(message_id = %message.message_id, error = %err, "hot delete failed after cold write");
            return Err(StoreError::migration(MigrationPhase::HotDelete, err));
        }

        info!(message_id = %message.message_id, chat_id = %message.chat_id, "message migrated to cold tier");
        Ok(())
    }

    /// Resolve rows left in `migrating` by an interrupted workflow.
    ///
    /// For each stalled row the cold tier is the source of truth: if the
    /// archived copy exists the hot delete is finished, otherwise the row
    /// is flipped back to `active`. Safe to run at startup and repeatedly.
    pub async fn recover(&self) -> Result<RecoveryReport, StoreError> {
        let mut report = RecoveryReport::default();

        for chat_id in self.hot.list_migrating_chats().await? {
            let lock = self.chat_lock(&chat_id);
            let outcome = {
                let _guard = lock.lock().await;
                self.recover_chat(&chat_id, &mut report).await
            };
            drop(lock);
            self.release_chat_lock(&chat_id);
            outcome?;
        }

        for (message_id, chat_id) in self.hot.list_migrating_messages().await? {
            let lock = self.chat_lock(&chat_id);
            let outcome = {
                let _guard = lock.lock().await;
                self.recover_message(&message_id, &chat_id, &mut report).await
            };
            drop(lock);
            self.release_chat_lock(&chat_id);
            outcome?;
        }

        Ok(report)
    }

    async fn recover_chat(
        &self,
        chat_id: &Uuid,
        report: &mut RecoveryReport,
    ) -> Result<(), StoreError> {
        if self.cold.chat_exists(chat_id).await? {
            match self.hot.finish_chat_migration(chat_id).await {
                Ok(()) => report.chats_completed += 1,
                Err(StoreError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
            info!(chat_id = %chat_id, "recovery completed stalled chat migration");
        } else {
            self.hot.abort_chat_migration(chat_id).await?;
            report.chats_rolled_back += 1;
            info!(chat_id = %chat_id, "recovery rolled back stalled chat migration");
        }
        Ok(())
    }

    async fn recover_message(
        &self,
        message_id: &Uuid,
        chat_id: &Uuid,
        report: &mut RecoveryReport,
    ) -> Result<(), StoreError> {
        if self.cold.message_exists(message_id).await? {
            match self.hot.finish_message_migration(message_id, chat_id).await {
                Ok(()) => report.messages_completed += 1,
                Err(StoreError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
            info!(message_id = %message_id, "recovery completed stalled message migration");
        } else {
            self.hot.abort_message_migration(message_id, chat_id).await?;
            report.messages_rolled_back += 1;
            info!(message_id = %message_id, "recovery rolled back stalled message migration");
        }
        Ok(())
    }
}
