use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    ports::ChatStore, truncate_for_storage, ChatMessage, ChatSession, DomainError, MessageRole,
};

/// Chat history in SQLite. Sessions cascade-delete their messages.
pub struct SqliteChatStore {
    pool: SqlitePool,
    max_message_chars: usize,
}

impl SqliteChatStore {
    pub async fn new(db_path: impl Into<PathBuf>, max_message_chars: usize) -> Result<Self, DomainError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| DomainError::internal(e.to_string()))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let store = Self {
            pool,
            max_message_chars,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), DomainError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_sessions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                subject TEXT NOT NULL,
                owner TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::internal(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_owner ON chat_sessions(owner)")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES chat_sessions(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::internal(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_session ON chat_messages(session_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(())
    }

    fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ChatSession, DomainError> {
        let id: String = row.get("id");
        let created_at: String = row.get("created_at");
        Ok(ChatSession {
            id: Uuid::from_str(&id).map_err(|e| DomainError::internal(e.to_string()))?,
            name: row.get("name"),
            subject: row.get("subject"),
            owner: row.get("owner"),
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::internal(format!("bad timestamp '{raw}': {e}")))
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn create_session(&self, session: &ChatSession) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO chat_sessions (id, name, subject, owner, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(session.id.to_string())
        .bind(&session.name)
        .bind(&session.subject)
        .bind(&session.owner)
        .bind(session.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(())
    }

    async fn list_sessions(&self, owner: &str) -> Result<Vec<ChatSession>, DomainError> {
        let rows = sqlx::query(
            "SELECT id, name, subject, owner, created_at
             FROM chat_sessions WHERE owner = ?1 ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::internal(e.to_string()))?;

        rows.iter().map(Self::session_from_row).collect()
    }

    async fn get_session(
        &self,
        id: Uuid,
        owner: &str,
    ) -> Result<Option<ChatSession>, DomainError> {
        let row = sqlx::query(
            "SELECT id, name, subject, owner, created_at
             FROM chat_sessions WHERE id = ?1 AND owner = ?2",
        )
        .bind(id.to_string())
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::internal(e.to_string()))?;

        row.as_ref().map(Self::session_from_row).transpose()
    }

    async fn update_session(
        &self,
        id: Uuid,
        owner: &str,
        name: Option<&str>,
        subject: Option<&str>,
    ) -> Result<(), DomainError> {
        let current = self
            .get_session(id, owner)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("chat session {id}")))?;

        let name = name.unwrap_or(&current.name);
        let subject = subject.unwrap_or(&current.subject);

        sqlx::query(
            "UPDATE chat_sessions SET name = ?1, subject = ?2 WHERE id = ?3 AND owner = ?4",
        )
        .bind(name)
        .bind(subject)
        .bind(id.to_string())
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(())
    }

    async fn delete_session(&self, id: Uuid, owner: &str) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = ?1 AND owner = ?2")
            .bind(id.to_string())
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("chat session {id}")));
        }
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<(), DomainError> {
        let stored = truncate_for_storage(content, self.max_message_chars);
        sqlx::query(
            "INSERT INTO chat_messages (session_id, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(session_id.to_string())
        .bind(role.as_str())
        .bind(stored)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(())
    }

    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, DomainError> {
        let rows = sqlx::query(
            "SELECT id, session_id, role, content, timestamp
             FROM chat_messages WHERE session_id = ?1 ORDER BY timestamp ASC, id ASC",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::internal(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let session: String = row.get("session_id");
                let role: String = row.get("role");
                let timestamp: String = row.get("timestamp");
                Ok(ChatMessage {
                    id: row.get("id"),
                    session_id: Uuid::from_str(&session)
                        .map_err(|e| DomainError::internal(e.to_string()))?,
                    role: MessageRole::parse(&role)
                        .ok_or_else(|| DomainError::internal(format!("bad role '{role}'")))?,
                    content: row.get("content"),
                    timestamp: parse_timestamp(&timestamp)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, SqliteChatStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteChatStore::new(dir.path().join("chat.db"), 50)
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_and_list_sessions_scoped_by_owner() {
        let (_dir, store) = store().await;

        let mine = ChatSession::new("alice", "Math");
        let theirs = ChatSession::new("bob", "Physics");
        store.create_session(&mine).await.unwrap();
        store.create_session(&theirs).await.unwrap();

        let sessions = store.list_sessions("alice").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, mine.id);

        assert!(store.get_session(mine.id, "bob").await.unwrap().is_none());
        assert!(store.get_session(mine.id, "alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_requires_ownership() {
        let (_dir, store) = store().await;

        let session = ChatSession::new("alice", "Math");
        store.create_session(&session).await.unwrap();

        assert!(store
            .update_session(session.id, "bob", Some("stolen"), None)
            .await
            .is_err());
        store
            .update_session(session.id, "alice", Some("limits"), Some("Physics"))
            .await
            .unwrap();

        let got = store.get_session(session.id, "alice").await.unwrap().unwrap();
        assert_eq!(got.name, "limits");
        assert_eq!(got.subject, "Physics");

        // A partial update leaves the other field alone.
        store
            .update_session(session.id, "alice", None, Some("Math"))
            .await
            .unwrap();
        let got = store.get_session(session.id, "alice").await.unwrap().unwrap();
        assert_eq!(got.name, "limits");
        assert_eq!(got.subject, "Math");
    }

    #[tokio::test]
    async fn test_messages_ordered_and_truncated() {
        let (_dir, store) = store().await;

        let session = ChatSession::new("alice", "Math");
        store.create_session(&session).await.unwrap();

        store
            .append_message(session.id, MessageRole::User, "what is a derivative?")
            .await
            .unwrap();
        let long = "x".repeat(100);
        store
            .append_message(session.id, MessageRole::Assistant, &long)
            .await
            .unwrap();

        let messages = store.list_messages(session.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert!(messages[1].content.ends_with("... [truncated]"));
    }

    #[tokio::test]
    async fn test_delete_session_cascades_messages() {
        let (_dir, store) = store().await;

        let session = ChatSession::new("alice", "Math");
        store.create_session(&session).await.unwrap();
        store
            .append_message(session.id, MessageRole::User, "hi")
            .await
            .unwrap();

        store.delete_session(session.id, "alice").await.unwrap();
        assert!(store.list_messages(session.id).await.unwrap().is_empty());
        assert!(store.get_session(session.id, "alice").await.unwrap().is_none());
    }
}
