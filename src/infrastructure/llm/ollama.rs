use std::time::Duration;

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::ollama;

use crate::domain::{ports::LlmService, DomainError};
use crate::infrastructure::config::LlmConfig;

/// Completion against a local Ollama server. The base url comes from
/// `OLLAMA_API_BASE_URL` (provider default: localhost).
pub struct OllamaLlm {
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl OllamaLlm {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.3,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn prompt_agent(
        &self,
        system: Option<&str>,
        prompt: &str,
    ) -> Result<String, DomainError> {
        let client = ollama::Client::from_env();
        let mut builder = client.agent(&self.model).temperature(self.temperature);
        if let Some(system) = system {
            builder = builder.preamble(system);
        }
        let agent = builder.build();

        tokio::time::timeout(self.timeout, agent.prompt(prompt))
            .await
            .map_err(|_| DomainError::timeout("LLM completion timed out"))?
            .map_err(|e| DomainError::external(e.to_string()))
    }
}

#[async_trait]
impl LlmService for OllamaLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.prompt_agent(None, prompt).await
    }

    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.prompt_agent(Some(system), prompt).await
    }
}
