use crate::domain::{errors::DomainError, SearchHit};
use async_trait::async_trait;

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, DomainError>;
}
