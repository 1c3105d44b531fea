mod answer;
mod chat;
mod document;
mod embedding;
mod subject;

pub use answer::{AnswerBundle, SearchHit};
pub use chat::{truncate_for_storage, ChatMessage, ChatSession, MessageRole};
pub use document::{split_text, ChunkMetadata, ChunkSearchResult, DocumentChunk};
pub use embedding::Embedding;
pub use subject::Subject;
