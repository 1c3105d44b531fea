use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::{
    ports::VectorStore, ChunkSearchResult, DocumentChunk, DomainError, Embedding,
};

/// Brute-force store for tests and local development without qdrant.
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<(DocumentChunk, Embedding)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &self,
        chunk: &DocumentChunk,
        embedding: &Embedding,
    ) -> Result<(), DomainError> {
        let mut store = self
            .chunks
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        store.retain(|(c, _)| c.id != chunk.id);
        store.push((chunk.clone(), embedding.clone()));
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ChunkSearchResult>, DomainError> {
        let store = self
            .chunks
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut results: Vec<ChunkSearchResult> = store
            .iter()
            .map(|(chunk, embedding)| ChunkSearchResult {
                chunk: chunk.clone(),
                score: query.cosine_similarity(embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(results.into_iter().take(top_k).collect())
    }

    async fn delete_by_source(&self, source: &str) -> Result<(), DomainError> {
        let mut store = self
            .chunks
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        store.retain(|(chunk, _)| chunk.source != source);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_search() {
        let store = InMemoryVectorStore::new();

        let chunk = DocumentChunk::new("notes.pdf", "test content", 0);
        let embedding = Embedding::new(vec![1.0, 0.0, 0.0]);

        store.upsert(&chunk, &embedding).await.unwrap();

        let query = Embedding::new(vec![1.0, 0.0, 0.0]);
        let results = store.search(&query, 1).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].chunk.source, "notes.pdf");
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_chunk_id() {
        let store = InMemoryVectorStore::new();

        let mut chunk = DocumentChunk::new("notes.pdf", "old", 0);
        let embedding = Embedding::new(vec![1.0, 0.0, 0.0]);
        store.upsert(&chunk, &embedding).await.unwrap();

        chunk.content = "new".to_string();
        store.upsert(&chunk, &embedding).await.unwrap();

        let results = store
            .search(&Embedding::new(vec![1.0, 0.0, 0.0]), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "new");
    }

    #[tokio::test]
    async fn test_delete_by_source() {
        let store = InMemoryVectorStore::new();

        let chunk = DocumentChunk::new("notes.pdf", "test", 0);
        let other = DocumentChunk::new("other.pdf", "kept", 0);
        let embedding = Embedding::new(vec![1.0, 0.0, 0.0]);

        store.upsert(&chunk, &embedding).await.unwrap();
        store.upsert(&other, &embedding).await.unwrap();
        store.delete_by_source("notes.pdf").await.unwrap();

        let results = store
            .search(&Embedding::new(vec![1.0, 0.0, 0.0]), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.source, "other.pdf");
    }
}
