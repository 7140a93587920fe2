// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ConversationStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use wicket_config::model::StorageConfig;
use wicket_core::types::{
    ChatMessage, Conversation, ConversationStatus, ConversationUpdate, TypingParty,
};
use wicket_core::{Adapter, AdapterType, ConversationStore, HealthStatus, WicketError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed conversation store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`SqliteConversationStore::initialize`]. Every conversation read
/// back from disk is validated before it reaches the engine.
pub struct SqliteConversationStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteConversationStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is
    /// called.
    ///
    /// [`initialize`]: SqliteConversationStore::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), WicketError> {
        let db =
            Database::open_with_options(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| WicketError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite conversation store initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, WicketError> {
        self.db.get().ok_or_else(|| WicketError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    fn validated(conversation: Conversation) -> Result<Conversation, WicketError> {
        conversation.validate()?;
        Ok(conversation)
    }
}

#[async_trait]
impl Adapter for SqliteConversationStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, WicketError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WicketError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), WicketError> {
        queries::conversations::create_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, WicketError> {
        queries::conversations::get_conversation(self.db()?, id)
            .await?
            .map(Self::validated)
            .transpose()
    }

    async fn find_active_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Conversation>, WicketError> {
        queries::conversations::find_active_by_external_id(self.db()?, external_id)
            .await?
            .map(Self::validated)
            .transpose()
    }

    async fn apply_update(
        &self,
        id: &str,
        update: ConversationUpdate,
    ) -> Result<(), WicketError> {
        queries::conversations::apply_update(self.db()?, id, update).await
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), WicketError> {
        queries::messages::append_message(self.db()?, message).await
    }

    async fn messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ChatMessage>, WicketError> {
        queries::messages::messages_for_conversation(self.db()?, conversation_id, limit).await
    }

    async fn list_conversations(
        &self,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, WicketError> {
        queries::conversations::list_conversations(self.db()?, status)
            .await?
            .into_iter()
            .map(Self::validated)
            .collect()
    }

    async fn list_idle_since(
        &self,
        statuses: &[ConversationStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Conversation>, WicketError> {
        queries::conversations::list_idle_since(self.db()?, statuses, cutoff)
            .await?
            .into_iter()
            .map(Self::validated)
            .collect()
    }

    async fn close_batch(
        &self,
        ids: &[String],
        ended_text: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, WicketError> {
        queries::conversations::close_batch(self.db()?, ids, ended_text, now).await
    }

    async fn set_typing(
        &self,
        conversation_id: &str,
        party: TypingParty,
        is_typing: bool,
        now: DateTime<Utc>,
    ) -> Result<(), WicketError> {
        queries::conversations::set_typing(self.db()?, conversation_id, party, is_typing, now)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wicket_core::types::ClientParams;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn store_implements_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("adapter.db");
        let store = SqliteConversationStore::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.adapter_type(), AdapterType::Storage);
        assert_eq!(store.version(), semver::Version::new(0, 1, 0));
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double.db");
        let store = SqliteConversationStore::new(make_config(db_path.to_str().unwrap()));

        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_fails_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let store = SqliteConversationStore::new(make_config(db_path.to_str().unwrap()));
        assert!(store.health_check().await.is_err());

        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn full_conversation_lifecycle_through_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let store = SqliteConversationStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();

        let conv = Conversation::new(
            "c-store".into(),
            "chat-store".into(),
            "v-1".into(),
            ClientParams {
                user_id: Some("u-9".into()),
                user_name: Some("Arta".into()),
                shop_id: None,
            },
            Utc::now(),
        );
        store.create_conversation(&conv).await.unwrap();

        let found = store
            .find_active_by_external_id("chat-store")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "c-store");
        assert_eq!(found.client.user_name.as_deref(), Some("Arta"));

        let msg = ChatMessage {
            id: "m-1".into(),
            conversation_id: "c-store".into(),
            role: wicket_core::MessageRole::User,
            content: "hello".into(),
            created_at: Utc::now(),
        };
        store.append_message(&msg).await.unwrap();
        let messages = store.messages("c-store", None).await.unwrap();
        assert_eq!(messages.len(), 1);

        store
            .apply_update(
                "c-store",
                ConversationUpdate::status(ConversationStatus::Pending),
            )
            .await
            .unwrap();
        let read = store.get_conversation("c-store").await.unwrap().unwrap();
        assert_eq!(read.status, ConversationStatus::Pending);

        let listed = store
            .list_conversations(Some(ConversationStatus::Pending))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn validation_rejects_corrupt_flag_state_on_read() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("corrupt.db");
        let store = SqliteConversationStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();

        let conv = Conversation::new(
            "c-bad".into(),
            "chat-bad".into(),
            "v-1".into(),
            ClientParams::default(),
            Utc::now(),
        );
        store.create_conversation(&conv).await.unwrap();

        // Corrupt the row directly: flag set while status is still `ai`.
        store
            .db()
            .unwrap()
            .connection()
            .call(|conn| {
                conn.execute(
                    "UPDATE conversations SET handoff_confirmation_pending = 1 WHERE id = 'c-bad'",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(store.get_conversation("c-bad").await.is_err());
    }
}
