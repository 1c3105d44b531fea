use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, ChatMessage, ChatSession, MessageRole};

/// Persistence seam for chat history. All reads are scoped to an owner so
/// one user can never see another's sessions.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_session(&self, session: &ChatSession) -> Result<(), DomainError>;
    async fn list_sessions(&self, owner: &str) -> Result<Vec<ChatSession>, DomainError>;
    async fn get_session(&self, id: Uuid, owner: &str)
        -> Result<Option<ChatSession>, DomainError>;
    async fn update_session(
        &self,
        id: Uuid,
        owner: &str,
        name: Option<&str>,
        subject: Option<&str>,
    ) -> Result<(), DomainError>;
    async fn delete_session(&self, id: Uuid, owner: &str) -> Result<(), DomainError>;
    async fn append_message(
        &self,
        session_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<(), DomainError>;
    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, DomainError>;
}
