use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{instrument, warn};

use crate::application::RagService;
use crate::domain::{split_text, DomainError};

/// Extracts page text from a document on disk. Implemented by the lopdf
/// adapter; a trait so ingestion tests can run without real PDFs.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String, DomainError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub skipped: usize,
    pub chunks: usize,
}

/// Turns uploaded PDFs into indexed chunks in a subject's collection.
pub struct IngestService {
    extractor: Arc<dyn TextExtractor>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl IngestService {
    pub fn new(extractor: Arc<dyn TextExtractor>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            extractor,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Processes each file independently: unreadable or empty documents
    /// are skipped with a warning, and the job only fails when no file
    /// yields any content. Re-ingesting a file replaces its old chunks.
    #[instrument(skip(self, rag, paths), fields(files = paths.len()))]
    pub async fn ingest_paths(
        &self,
        rag: &RagService,
        paths: &[PathBuf],
    ) -> Result<IngestReport, DomainError> {
        if paths.is_empty() {
            return Err(DomainError::validation("No files provided to ingest."));
        }

        let mut report = IngestReport {
            documents: 0,
            skipped: 0,
            chunks: 0,
        };

        for path in paths {
            let source = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload.pdf")
                .to_string();

            if !source.to_lowercase().ends_with(".pdf") {
                warn!(%source, "skipping non-PDF upload");
                report.skipped += 1;
                continue;
            }

            let text = match self.extractor.extract_text(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(%source, error = %e, "skipping unreadable document");
                    report.skipped += 1;
                    continue;
                }
            };

            let chunks = split_text(&source, &text, self.chunk_size, self.chunk_overlap);
            if chunks.is_empty() {
                warn!(%source, "document produced no chunks");
                report.skipped += 1;
                continue;
            }

            rag.delete_source(&source).await?;
            rag.index_chunks(&chunks).await?;

            report.documents += 1;
            report.chunks += chunks.len();
        }

        if report.documents == 0 {
            return Err(DomainError::validation(
                "No content could be extracted from the uploaded files.",
            ));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::domain::{ports::EmbeddingService, Embedding};
    use crate::infrastructure::vector_store::InMemoryVectorStore;

    struct FakeExtractor;

    impl TextExtractor for FakeExtractor {
        fn extract_text(&self, path: &Path) -> Result<String, DomainError> {
            if path.to_string_lossy().contains("broken") {
                Err(DomainError::internal("unreadable"))
            } else {
                Ok("First paragraph of text.\n\nSecond paragraph of text.".to_string())
            }
        }
    }

    struct UnitEmbedding;

    #[async_trait]
    impl EmbeddingService for UnitEmbedding {
        async fn embed(&self, _text: &str) -> Result<Embedding, DomainError> {
            Ok(Embedding::new(vec![1.0, 0.0]))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
            Ok(texts.iter().map(|_| Embedding::new(vec![1.0, 0.0])).collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn rag() -> RagService {
        RagService::new(Arc::new(UnitEmbedding), Arc::new(InMemoryVectorStore::new()), 3)
    }

    #[tokio::test]
    async fn test_ingest_counts_documents_and_skips() {
        let service = IngestService::new(Arc::new(FakeExtractor), 1000, 100);
        let rag = rag();

        let paths = vec![
            PathBuf::from("/tmp/notes.pdf"),
            PathBuf::from("/tmp/broken.pdf"),
            PathBuf::from("/tmp/image.png"),
        ];
        let report = service.ingest_paths(&rag, &paths).await.unwrap();

        assert_eq!(report.documents, 1);
        assert_eq!(report.skipped, 2);
        assert!(report.chunks > 0);
    }

    #[tokio::test]
    async fn test_ingest_fails_when_nothing_readable() {
        let service = IngestService::new(Arc::new(FakeExtractor), 1000, 100);
        let rag = rag();

        let paths = vec![PathBuf::from("/tmp/broken.pdf")];
        let err = service.ingest_paths(&rag, &paths).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_ingest_rejects_empty_path_list() {
        let service = IngestService::new(Arc::new(FakeExtractor), 1000, 100);
        let rag = rag();

        assert!(service.ingest_paths(&rag, &[]).await.is_err());
    }
}
