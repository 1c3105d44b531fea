use std::collections::HashMap;

use serde::Deserialize;

/// Everything the binaries need at startup: runtime settings plus the
/// prompt templates. Prompts can be overridden from a YAML file so they
/// are tunable without a rebuild.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Builds the config from defaults, environment overrides, and the
    /// optional prompts file named by `PROMPTS_PATH`.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut app = AppConfig::default();
        app.config.apply_env();

        if let Ok(path) = std::env::var("PROMPTS_PATH") {
            let raw = std::fs::read_to_string(&path)?;
            app.prompts = serde_yaml::from_str(&raw)?;
        }

        Ok(app)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub search: SearchConfig,
    pub scrape: ScrapeConfig,
    pub auth: AuthConfig,
    pub worker: WorkerConfig,
    pub chat: ChatConfig,
    pub ingest: IngestConfig,
    pub cors: CorsConfig,
    pub subjects: Vec<String>,
    pub redis_url: String,
    pub database_url: String,
    pub qdrant_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            rag: RagConfig::default(),
            search: SearchConfig::default(),
            scrape: ScrapeConfig::default(),
            auth: AuthConfig::default(),
            worker: WorkerConfig::default(),
            chat: ChatConfig::default(),
            ingest: IngestConfig::default(),
            cors: CorsConfig::default(),
            subjects: vec![
                "Computer Science".to_string(),
                "Math".to_string(),
                "Physics".to_string(),
            ],
            redis_url: "redis://localhost:6379".to_string(),
            database_url: "data/edu_agent.db".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
        }
    }
}

impl Config {
    fn apply_env(&mut self) {
        override_string(&mut self.server.host, "SERVER_HOST");
        override_parse(&mut self.server.port, "SERVER_PORT");
        override_string(&mut self.redis_url, "REDIS_URL");
        override_string(&mut self.database_url, "DATABASE_PATH");
        override_string(&mut self.qdrant_url, "QDRANT_URL");
        override_string(&mut self.llm.model, "LLM_MODEL");
        override_parse(&mut self.llm.temperature, "LLM_TEMPERATURE");
        override_parse(&mut self.llm.timeout_seconds, "LLM_TIMEOUT_SECONDS");
        override_string(&mut self.embedding.model, "EMBEDDING_MODEL");
        override_parse(&mut self.embedding.dimension, "EMBEDDING_DIMENSION");
        override_parse(&mut self.rag.top_k, "RETRIEVER_K");
        override_parse(&mut self.worker.concurrency, "WORKER_CONCURRENCY");
        override_string(&mut self.ingest.spool_dir, "UPLOAD_SPOOL_DIR");
        override_parse(&mut self.ingest.max_upload_mb, "MAX_UPLOAD_SIZE_MB");

        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Ok(id) = std::env::var("GOOGLE_CSE_ID") {
            self.search.engine_id = Some(id);
        }
        if let Ok(raw) = std::env::var("SUBJECTS") {
            let subjects: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !subjects.is_empty() {
                self.subjects = subjects;
            }
        }
        if let Ok(raw) = std::env::var("API_KEYS") {
            self.auth.api_keys = parse_api_keys(&raw);
        }
        if let Ok(raw) = std::env::var("CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }
}

fn override_string(slot: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() {
            *slot = value;
        }
    }
}

fn override_parse<T: std::str::FromStr>(slot: &mut T, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if let Ok(parsed) = value.parse() {
            *slot = parsed;
        }
    }
}

/// `API_KEYS=alice:secret1,bob:secret2`; the name becomes the owner
/// identity attached to sessions created with that key.
fn parse_api_keys(raw: &str) -> Vec<ApiKey> {
    raw.split(',')
        .filter_map(|entry| {
            let (name, key) = entry.trim().split_once(':')?;
            if name.is_empty() || key.is_empty() {
                return None;
            }
            Some(ApiKey {
                name: name.to_string(),
                key: key.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f64,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-r1:1.5b".to_string(),
            temperature: 0.3,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimension: 768,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            chunk_size: 1200,
            chunk_overlap: 150,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub engine_id: Option<String>,
    pub num_results: usize,
    pub timeout_seconds: u64,
}

impl SearchConfig {
    pub fn num_results_or_default(&self) -> usize {
        if self.num_results == 0 {
            5
        } else {
            self.num_results
        }
    }

    pub fn timeout_or_default(&self) -> u64 {
        if self.timeout_seconds == 0 {
            10
        } else {
            self.timeout_seconds
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub timeout_seconds: u64,
    pub min_content_chars: usize,
    pub max_content_chars: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            min_content_chars: 100,
            max_content_chars: 15_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub result_ttl_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            result_ttl_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub max_message_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub spool_dir: String,
    pub max_upload_mb: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            spool_dir: "data/uploads".to_string(),
            max_upload_mb: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Subject-specific RAG system prompts; subjects without an entry fall
    /// back to `rag_system_default`. `{subject}` is substituted.
    pub rag_system: HashMap<String, String>,
    pub rag_system_default: String,
    pub rag_user: String,
    pub direct: String,
    pub web_synthesis: String,
    pub aggregator_system: String,
    pub aggregator_user: String,
}

impl PromptsConfig {
    pub fn rag_system_for(&self, subject: &str) -> String {
        self.rag_system
            .get(subject)
            .unwrap_or(&self.rag_system_default)
            .replace("{subject}", subject)
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        let mut rag_system = HashMap::new();
        rag_system.insert(
            "Computer Science".to_string(),
            "You are an educational assistant specialized in {subject}. \
             When asked to define or explain a concept using the provided context, \
             provide a clear and concise definition or explanation based *only* on that context. \
             Avoid discussing unrelated topics such as job market impact unless explicitly \
             requested and present in the context. \
             If the context doesn't contain the answer, state that."
                .to_string(),
        );
        rag_system.insert(
            "Math".to_string(),
            "You are an educational assistant specialized in {subject}. \
             Using *only* the provided context, provide precise definitions and \
             step-by-step explanations for mathematical concepts. \
             Include examples and proofs *if* they are available in the context. \
             If the context doesn't contain the answer, state that."
                .to_string(),
        );
        rag_system.insert(
            "Physics".to_string(),
            "You are an educational assistant specialized in {subject}. \
             Using *only* the provided context, offer clear definitions and detailed \
             explanations for physics concepts. \
             Use real-world examples *if* they are present in the context. \
             If the context doesn't contain the answer, state that."
                .to_string(),
        );

        Self {
            rag_system,
            rag_system_default: "You are an educational assistant for {subject}. \
                 Provide clear, concise, and accurate answers based *only* on the given context. \
                 If the context doesn't contain the answer, state that."
                .to_string(),
            rag_user: "Context:\n{context}\n\nQuestion: {question}\n\n\
                 Based *only* on the context above, provide a precise and well-structured answer."
                .to_string(),
            direct: "You are an AI expert in {subject}. Answer the following question \
                 accurately and concisely.\n\nQuestion: {question}\n\nAnswer:"
                .to_string(),
            web_synthesis: "You are an educational assistant specialized in {subject}.\n\
                 Based *only* on the following web content, answer the question concisely \
                 and clearly.\n\
                 If the answer is not found in the content, state that clearly and do not \
                 invent information.\n\n\
                 Web Content:\n{content}\n\nQuestion: {question}\nAnswer:"
                .to_string(),
            aggregator_system: "You are a highly intelligent AI assistant specializing in \
                 {subject}. Your task is to synthesize information from up to three different \
                 sources: a knowledge base (RAG), a general language model (LLM), and web \
                 search results (Web). Analyze the provided answers below, noting consensus \
                 and discrepancies. Construct a single, comprehensive, accurate, and \
                 well-structured final answer to the user's original question. Prioritize \
                 information confirmed by multiple sources, especially the RAG source if it \
                 provided a relevant answer. If sources conflict significantly on key points, \
                 you may briefly mention the differing views if crucial for understanding, \
                 but aim for a unified answer. Ignore sources marked as 'Not available' or \
                 similar. Do not mention the source names (RAG, LLM, Web) or the aggregation \
                 process in your final output. Focus solely on providing the best possible \
                 answer to the original question based on the information provided.\n\
                 IMPORTANT: DO NOT include <think>...</think> tags in your final output."
                .to_string(),
            aggregator_user: "Original Question: {question}\n\n---\n\
                 Answer from Document Knowledge Base (RAG):\n{rag}\n\n---\n\
                 Answer from General Language Model (LLM):\n{llm}\n\n---\n\
                 Answer from Web Search (Web):\n{web}\n\n---\n\
                 Synthesized Final Answer:"
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_required_sections() {
        let config = Config::default();
        assert_eq!(config.rag.chunk_size, 1200);
        assert_eq!(config.rag.chunk_overlap, 150);
        assert_eq!(config.subjects.len(), 3);
        assert_eq!(config.chat.max_message_chars, 10_000);
    }

    #[test]
    fn test_rag_system_prompt_fallback() {
        let prompts = PromptsConfig::default();
        let known = prompts.rag_system_for("Math");
        assert!(known.contains("Math"));
        assert!(known.contains("step-by-step"));

        let unknown = prompts.rag_system_for("History");
        assert!(unknown.contains("History"));
        assert!(unknown.contains("educational assistant for"));
    }

    #[test]
    fn test_parse_api_keys() {
        let keys = parse_api_keys("alice:s1, bob:s2,broken,:x,y:");
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].name, "alice");
        assert_eq!(keys[1].key, "s2");
    }

    #[test]
    fn test_prompts_yaml_partial_override() {
        let yaml = "direct: \"Answer as a {subject} tutor: {question}\"\n";
        let prompts: PromptsConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(prompts.direct.starts_with("Answer as a"));
        // Untouched fields keep their defaults.
        assert!(prompts.aggregator_user.contains("{rag}"));
    }
}
