pub mod chat_store;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod pdf;
pub mod queue;
pub mod registry;
pub mod scrape;
pub mod search;
pub mod vector_store;

pub use chat_store::SqliteChatStore;
pub use config::AppConfig;
pub use embedding::OllamaEmbedding;
pub use llm::OllamaLlm;
pub use pdf::PdfTextExtractor;
pub use queue::{keys, queues, IngestDocumentJob, JobResult, QueueJobStatus};
pub use registry::SubjectRegistry;
pub use scrape::HtmlPageFetcher;
pub use search::GoogleSearch;
pub use vector_store::{InMemoryVectorStore, QdrantVectorStore};
