use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::application::{AgentOptions, RagService, SubjectAgent, SubjectPrompts};
use crate::domain::{DomainError, Subject};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::embedding::OllamaEmbedding;
use crate::infrastructure::llm::OllamaLlm;
use crate::infrastructure::scrape::HtmlPageFetcher;
use crate::infrastructure::search::GoogleSearch;
use crate::infrastructure::vector_store::QdrantVectorStore;

/// All subject agents, built once at startup. The LLM, embedding model,
/// search client and page fetcher are shared; each subject gets its own
/// qdrant collection and retrieval service.
pub struct SubjectRegistry {
    names: Vec<String>,
    agents: HashMap<String, Arc<SubjectAgent>>,
}

impl SubjectRegistry {
    pub async fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        let llm = Arc::new(OllamaLlm::from_config(&config.config.llm));
        let embedding = Arc::new(OllamaEmbedding::from_config(&config.config.embedding));
        let search = Arc::new(GoogleSearch::from_config(&config.config.search));
        let fetcher = Arc::new(HtmlPageFetcher::from_config(&config.config.scrape));

        let options = AgentOptions {
            search_results: config.config.search.num_results_or_default(),
            max_web_content_chars: config.config.scrape.max_content_chars,
        };

        let mut names = Vec::new();
        let mut agents = HashMap::new();

        for name in &config.config.subjects {
            let subject = Subject::new(name);
            let store = Arc::new(
                QdrantVectorStore::new(
                    &config.config.qdrant_url,
                    &subject.collection_name(),
                    config.config.embedding.dimension,
                )
                .await?,
            );
            let rag = Arc::new(RagService::new(
                embedding.clone(),
                store,
                config.config.rag.top_k,
            ));

            let prompts = SubjectPrompts {
                rag_system: config.prompts.rag_system_for(name),
                rag_user: config.prompts.rag_user.clone(),
                direct: config.prompts.direct.clone(),
                web_synthesis: config.prompts.web_synthesis.clone(),
                aggregator_system: config.prompts.aggregator_system.clone(),
                aggregator_user: config.prompts.aggregator_user.clone(),
            };

            info!(subject = %name, collection = %subject.collection_name(), "initialized subject agent");
            names.push(name.clone());
            agents.insert(
                name.clone(),
                Arc::new(SubjectAgent::new(
                    subject,
                    rag,
                    llm.clone(),
                    search.clone(),
                    fetcher.clone(),
                    prompts,
                    options,
                )),
            );
        }

        Ok(Self { names, agents })
    }

    pub fn get(&self, subject: &str) -> Option<Arc<SubjectAgent>> {
        self.agents.get(subject).cloned()
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.agents.contains_key(subject)
    }

    /// Subject names in configuration order.
    pub fn subject_names(&self) -> &[String] {
        &self.names
    }
}
