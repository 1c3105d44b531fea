mod agent;
mod ingest;
mod rag;

pub use agent::{strip_reasoning, AgentOptions, SubjectAgent, SubjectPrompts};
pub use ingest::{IngestReport, IngestService, TextExtractor};
pub use rag::RagService;
