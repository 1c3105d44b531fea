use crate::domain::{errors::DomainError, ChunkSearchResult, DocumentChunk, Embedding};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, chunk: &DocumentChunk, embedding: &Embedding)
        -> Result<(), DomainError>;
    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ChunkSearchResult>, DomainError>;
    async fn delete_by_source(&self, source: &str) -> Result<(), DomainError>;
}
