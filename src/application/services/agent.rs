use std::sync::{Arc, LazyLock};

use futures::future::join_all;
use regex::Regex;
use tracing::{instrument, warn};

use crate::application::RagService;
use crate::domain::{
    ports::{LlmService, PageFetcher, WebSearch},
    AnswerBundle, Subject,
};

/// Prompt templates already specialized for one subject. Placeholders
/// (`{question}`, `{context}`, `{content}`, `{rag}`, `{llm}`, `{web}`)
/// are substituted per call.
#[derive(Debug, Clone)]
pub struct SubjectPrompts {
    pub rag_system: String,
    pub rag_user: String,
    pub direct: String,
    pub web_synthesis: String,
    pub aggregator_system: String,
    pub aggregator_user: String,
}

#[derive(Debug, Clone, Copy)]
pub struct AgentOptions {
    pub search_results: usize,
    pub max_web_content_chars: usize,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            search_results: 5,
            max_web_content_chars: 15_000,
        }
    }
}

/// One tutoring agent: a subject-scoped knowledge base plus the three
/// answer sources and the synthesis step that merges them.
pub struct SubjectAgent {
    subject: Subject,
    rag: Arc<RagService>,
    llm: Arc<dyn LlmService>,
    search: Arc<dyn WebSearch>,
    fetcher: Arc<dyn PageFetcher>,
    prompts: SubjectPrompts,
    options: AgentOptions,
}

// Sources whose answer matches one of these markers are excluded from
// synthesis and replaced with a placeholder in the aggregator prompt.
const RAG_UNAVAILABLE: &[&str] = &["an error occurred", "do not seem to contain"];
const LLM_UNAVAILABLE: &[&str] = &["an error occurred", "empty response"];
const WEB_UNAVAILABLE: &[&str] = &[
    "an error occurred during web search",
    "could not find relevant websites",
    "failed to scrape content",
    "could not extract meaningful content",
    "could not find a specific answer",
    "error synthesizing answer",
    "no websites provided",
];

// Model phrasings that mean "the context did not contain the answer".
const RAG_NON_ANSWERS: &[&str] = &[
    "cannot find relevant information",
    "context doesn't contain",
    "context does not contain",
    "based on the context provided",
    "based on the text provided",
    "information provided does not",
    "i cannot answer",
];
const WEB_NON_ANSWERS: &[&str] = &[
    "cannot find relevant information",
    "answer is not found",
    "content does not provide",
    "based on the provided content",
    "information given does not",
    "i cannot answer",
    "provided text does not contain",
];

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>\s*").expect("valid regex"));

/// Drops reasoning-trace markup that reasoning models leak into output.
pub fn strip_reasoning(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

fn take_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

impl SubjectAgent {
    pub fn new(
        subject: Subject,
        rag: Arc<RagService>,
        llm: Arc<dyn LlmService>,
        search: Arc<dyn WebSearch>,
        fetcher: Arc<dyn PageFetcher>,
        prompts: SubjectPrompts,
        options: AgentOptions,
    ) -> Self {
        Self {
            subject,
            rag,
            llm,
            search,
            fetcher,
            prompts,
            options,
        }
    }

    pub fn rag_service(&self) -> &Arc<RagService> {
        &self.rag
    }

    /// Runs all three sources and synthesizes the final answer. Individual
    /// source failures degrade into explanatory strings; this never fails.
    #[instrument(skip(self), fields(subject = %self.subject.name))]
    pub async fn answer_question(&self, question: &str) -> AnswerBundle {
        let mut bundle = AnswerBundle::empty();

        let (urls, search_failure) = match self
            .search
            .search(question, self.options.search_results)
            .await
        {
            Ok(hits) if !hits.is_empty() => {
                bundle.sources = hits.iter().map(|h| h.url.clone()).collect();
                (bundle.sources.clone(), None)
            }
            Ok(_) => {
                bundle.sources = vec!["No relevant websites found.".to_string()];
                (
                    Vec::new(),
                    Some("Could not find relevant websites for this question.".to_string()),
                )
            }
            Err(e) => {
                warn!(error = %e, "web search failed");
                bundle.sources = vec!["Web search error.".to_string()];
                (
                    Vec::new(),
                    Some("An error occurred during web search.".to_string()),
                )
            }
        };

        let web_fut = async {
            match search_failure {
                Some(msg) => msg,
                None => self.web_answer(question, &urls).await,
            }
        };

        let (rag, llm, web) = tokio::join!(
            self.rag_answer(question),
            self.llm_answer(question),
            web_fut
        );
        bundle.rag = rag;
        bundle.llm = llm;
        bundle.web = web;

        bundle.final_answer = self
            .aggregate(question, &bundle.rag, &bundle.llm, &bundle.web)
            .await;
        bundle
    }

    /// Retrieval-augmented answer from the subject knowledge base.
    #[instrument(skip(self), fields(subject = %self.subject.name))]
    pub async fn rag_answer(&self, question: &str) -> String {
        let not_in_documents = format!(
            "The documents for {} do not seem to contain an answer to this question.",
            self.subject.name
        );

        let results = match self.rag.retrieve(question).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "retrieval failed");
                return format!(
                    "An error occurred while retrieving documents for {}.",
                    self.subject.name
                );
            }
        };

        if results.is_empty() {
            return not_in_documents;
        }

        let context = results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = self
            .prompts
            .rag_user
            .replace("{context}", &context)
            .replace("{question}", question);

        match self
            .llm
            .complete_with_system(&self.prompts.rag_system, &prompt)
            .await
        {
            Ok(raw) => {
                let answer = strip_reasoning(&raw);
                let too_short = answer.chars().count() < 50
                    && (answer.to_lowercase().contains("based on")
                        || answer.to_lowercase().contains("context"));
                if contains_any(&answer, RAG_NON_ANSWERS) || too_short {
                    not_in_documents
                } else {
                    answer
                }
            }
            Err(e) => {
                warn!(error = %e, "rag completion failed");
                "An error occurred while generating the document-based answer.".to_string()
            }
        }
    }

    /// Baseline answer straight from the model, no retrieval.
    #[instrument(skip(self), fields(subject = %self.subject.name))]
    pub async fn llm_answer(&self, question: &str) -> String {
        let prompt = self
            .prompts
            .direct
            .replace("{subject}", &self.subject.name)
            .replace("{question}", question);

        match self.llm.complete(&prompt).await {
            Ok(raw) => {
                let answer = strip_reasoning(&raw);
                if answer.is_empty() {
                    "The language model returned an empty response.".to_string()
                } else {
                    answer
                }
            }
            Err(e) => {
                warn!(error = %e, "direct completion failed");
                "An error occurred while contacting the language model.".to_string()
            }
        }
    }

    /// Scrapes the search hits and asks the model to answer from that
    /// content alone.
    #[instrument(skip(self, urls), fields(subject = %self.subject.name, urls = urls.len()))]
    pub async fn web_answer(&self, question: &str, urls: &[String]) -> String {
        if urls.is_empty() {
            return "No websites provided for scraping.".to_string();
        }

        let fetches = join_all(urls.iter().map(|url| self.fetcher.fetch_text(url))).await;

        let mut content = String::new();
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for (url, fetched) in urls.iter().zip(fetches) {
            match fetched {
                Ok(text) if !text.is_empty() => {
                    content.push_str(&text);
                    content.push_str("\n\n");
                    succeeded += 1;
                }
                Ok(_) => failed += 1,
                Err(e) => {
                    warn!(url = %url, error = %e, "scrape failed");
                    failed += 1;
                }
            }
        }
        tracing::debug!(succeeded, failed, "web scraping finished");

        if content.is_empty() {
            return if failed > 0 {
                "Found websites, but failed to scrape content from any of them.".to_string()
            } else {
                "Scraped some websites, but could not extract meaningful content.".to_string()
            };
        }

        let truncated = take_chars(&content, self.options.max_web_content_chars);
        let prompt = self
            .prompts
            .web_synthesis
            .replace("{subject}", &self.subject.name)
            .replace("{content}", &truncated)
            .replace("{question}", question);

        match self.llm.complete(&prompt).await {
            Ok(raw) => {
                let answer = strip_reasoning(&raw);
                let too_short = answer.chars().count() < 60
                    && (answer.to_lowercase().contains("based on")
                        || answer.to_lowercase().contains("content"));
                if answer.is_empty() || contains_any(&answer, WEB_NON_ANSWERS) || too_short {
                    "Could not find a specific answer from the scraped web content.".to_string()
                } else {
                    answer
                }
            }
            Err(e) => {
                warn!(error = %e, "web synthesis failed");
                "Error synthesizing answer from web content.".to_string()
            }
        }
    }

    /// Merges the candidate answers into one response. Sources whose
    /// answer matches an unavailability marker are replaced with
    /// placeholder text; if the synthesis call itself fails, the best
    /// available source answer is returned instead.
    #[instrument(skip_all, fields(subject = %self.subject.name))]
    pub async fn aggregate(&self, question: &str, rag: &str, llm: &str, web: &str) -> String {
        let rag_available = !rag.is_empty() && !contains_any(rag, RAG_UNAVAILABLE);
        let llm_available = !llm.is_empty() && !contains_any(llm, LLM_UNAVAILABLE);
        let web_available = !web.is_empty() && !contains_any(web, WEB_UNAVAILABLE);

        if !rag_available && !llm_available && !web_available {
            return format!(
                "Sorry, I could not find a reliable answer from any source.\n\
                 Details:\nDocuments: {rag}\nLLM: {llm}\nWeb: {web}"
            );
        }

        let rag_input = if rag_available {
            rag
        } else {
            "Not available or not found in documents."
        };
        let llm_input = if llm_available {
            llm
        } else {
            "LLM baseline failed or unavailable."
        };
        let web_input = if web_available {
            web
        } else {
            "Not available or not found on web."
        };

        let system = self
            .prompts
            .aggregator_system
            .replace("{subject}", &self.subject.name);
        let prompt = self
            .prompts
            .aggregator_user
            .replace("{question}", question)
            .replace("{rag}", rag_input)
            .replace("{llm}", llm_input)
            .replace("{web}", web_input);

        match self.llm.complete_with_system(&system, &prompt).await {
            Ok(raw) => {
                let cleaned = strip_reasoning(&raw);
                if cleaned.is_empty() {
                    "Synthesis returned an empty response.".to_string()
                } else {
                    cleaned
                }
            }
            Err(e) => {
                warn!(error = %e, "synthesis failed, falling back to best source");
                if rag_available {
                    format!("(Synthesis failed) Best answer from documents: {rag_input}")
                } else if web_available {
                    format!("(Synthesis failed) Best answer from the web: {web_input}")
                } else {
                    format!("(Synthesis failed) Best answer from the language model: {llm_input}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::domain::{
        ports::{EmbeddingService, LlmService, PageFetcher, WebSearch},
        DomainError, Embedding, SearchHit,
    };
    use crate::infrastructure::vector_store::InMemoryVectorStore;

    struct FixedLlm {
        response: String,
        fail: bool,
    }

    #[async_trait]
    impl LlmService for FixedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, DomainError> {
            if self.fail {
                Err(DomainError::external("llm down"))
            } else {
                Ok(self.response.clone())
            }
        }

        async fn complete_with_system(
            &self,
            _system: &str,
            _prompt: &str,
        ) -> Result<String, DomainError> {
            self.complete("").await
        }
    }

    struct FixedSearch {
        hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl WebSearch for FixedSearch {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>, DomainError> {
            Ok(self.hits.clone())
        }
    }

    struct FixedFetcher {
        text: String,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl PageFetcher for FixedFetcher {
        async fn fetch_text(&self, _url: &str) -> Result<String, DomainError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.text.clone())
        }
    }

    struct UnitEmbedding;

    #[async_trait]
    impl EmbeddingService for UnitEmbedding {
        async fn embed(&self, _text: &str) -> Result<Embedding, DomainError> {
            Ok(Embedding::new(vec![1.0, 0.0, 0.0]))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
            Ok(texts.iter().map(|_| Embedding::new(vec![1.0, 0.0, 0.0])).collect())
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn prompts() -> SubjectPrompts {
        SubjectPrompts {
            rag_system: "system".into(),
            rag_user: "Context:\n{context}\n\nQuestion: {question}".into(),
            direct: "{subject}: {question}".into(),
            web_synthesis: "{subject} {content} {question}".into(),
            aggregator_system: "synthesize for {subject}".into(),
            aggregator_user: "{question} {rag} {llm} {web}".into(),
        }
    }

    fn agent_with(llm: FixedLlm, search: FixedSearch, fetcher: FixedFetcher) -> SubjectAgent {
        let rag = Arc::new(RagService::new(
            Arc::new(UnitEmbedding),
            Arc::new(InMemoryVectorStore::new()),
            3,
        ));
        SubjectAgent::new(
            Subject::new("Math"),
            rag,
            Arc::new(llm),
            Arc::new(search),
            Arc::new(fetcher),
            prompts(),
            AgentOptions::default(),
        )
    }

    #[test]
    fn test_strip_reasoning_removes_think_blocks() {
        let raw = "<think>chain of thought\nmore</think>  The answer is 4.";
        assert_eq!(strip_reasoning(raw), "The answer is 4.");

        let multi = "<think>a</think>first<think>b</think> second";
        assert_eq!(strip_reasoning(multi), "first second");

        assert_eq!(strip_reasoning("plain"), "plain");
    }

    #[tokio::test]
    async fn test_rag_answer_empty_store_reports_missing_documents() {
        let agent = agent_with(
            FixedLlm {
                response: "unused".into(),
                fail: false,
            },
            FixedSearch { hits: vec![] },
            FixedFetcher {
                text: String::new(),
                calls: Mutex::new(0),
            },
        );

        let answer = agent.rag_answer("what is a limit?").await;
        assert!(answer.contains("do not seem to contain"));
        assert!(answer.contains("Math"));
    }

    #[tokio::test]
    async fn test_llm_answer_error_degrades() {
        let agent = agent_with(
            FixedLlm {
                response: String::new(),
                fail: true,
            },
            FixedSearch { hits: vec![] },
            FixedFetcher {
                text: String::new(),
                calls: Mutex::new(0),
            },
        );

        let answer = agent.llm_answer("q").await;
        assert_eq!(
            answer,
            "An error occurred while contacting the language model."
        );
    }

    #[tokio::test]
    async fn test_web_answer_all_scrapes_fail() {
        let agent = agent_with(
            FixedLlm {
                response: "unused".into(),
                fail: false,
            },
            FixedSearch { hits: vec![] },
            FixedFetcher {
                text: String::new(),
                calls: Mutex::new(0),
            },
        );

        let urls = vec!["https://a.example".to_string(), "https://b.example".to_string()];
        let answer = agent.web_answer("q", &urls).await;
        assert!(answer.contains("failed to scrape content"));
    }

    #[tokio::test]
    async fn test_web_answer_non_answer_detection() {
        let agent = agent_with(
            FixedLlm {
                response: "The answer is not found in the provided pages.".into(),
                fail: false,
            },
            FixedSearch { hits: vec![] },
            FixedFetcher {
                text: "Plenty of page content to summarize here.".into(),
                calls: Mutex::new(0),
            },
        );

        let urls = vec!["https://a.example".to_string()];
        let answer = agent.web_answer("q", &urls).await;
        assert_eq!(
            answer,
            "Could not find a specific answer from the scraped web content."
        );
    }

    #[tokio::test]
    async fn test_aggregate_all_unavailable() {
        let agent = agent_with(
            FixedLlm {
                response: "unused".into(),
                fail: false,
            },
            FixedSearch { hits: vec![] },
            FixedFetcher {
                text: String::new(),
                calls: Mutex::new(0),
            },
        );

        let out = agent
            .aggregate(
                "q",
                "An error occurred while retrieving documents for Math.",
                "An error occurred while contacting the language model.",
                "Could not find relevant websites for this question.",
            )
            .await;

        assert!(out.starts_with("Sorry, I could not find a reliable answer"));
        assert!(out.contains("Details:"));
    }

    #[tokio::test]
    async fn test_aggregate_strips_reasoning_markup() {
        let agent = agent_with(
            FixedLlm {
                response: "<think>weighing sources</think>Combined answer.".into(),
                fail: false,
            },
            FixedSearch { hits: vec![] },
            FixedFetcher {
                text: String::new(),
                calls: Mutex::new(0),
            },
        );

        let out = agent.aggregate("q", "A good rag answer.", "", "").await;
        assert_eq!(out, "Combined answer.");
    }

    #[tokio::test]
    async fn test_aggregate_falls_back_to_documents_on_llm_failure() {
        let agent = agent_with(
            FixedLlm {
                response: String::new(),
                fail: true,
            },
            FixedSearch { hits: vec![] },
            FixedFetcher {
                text: String::new(),
                calls: Mutex::new(0),
            },
        );

        let out = agent
            .aggregate("q", "Documents say X.", "LLM says Y.", "Web says Z.")
            .await;
        assert_eq!(out, "(Synthesis failed) Best answer from documents: Documents say X.");
    }

    #[tokio::test]
    async fn test_answer_question_collects_sources_and_fans_out() {
        let hits = vec![
            SearchHit {
                title: "A".into(),
                url: "https://a.example".into(),
                snippet: "".into(),
            },
            SearchHit {
                title: "B".into(),
                url: "https://b.example".into(),
                snippet: "".into(),
            },
        ];
        let agent = agent_with(
            FixedLlm {
                response: "A sufficiently long and helpful model answer for the question asked."
                    .into(),
                fail: false,
            },
            FixedSearch { hits },
            FixedFetcher {
                text: "Long enough page content for the summarizer to work with.".into(),
                calls: Mutex::new(0),
            },
        );

        let bundle = agent.answer_question("what is a derivative?").await;
        assert_eq!(
            bundle.sources,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(!bundle.final_answer.is_empty());
        assert!(!bundle.llm.is_empty());
        assert!(!bundle.web.is_empty());
    }

    #[tokio::test]
    async fn test_answer_question_search_empty_degrades_web_source() {
        let agent = agent_with(
            FixedLlm {
                response: "A sufficiently long and helpful model answer for the question asked."
                    .into(),
                fail: false,
            },
            FixedSearch { hits: vec![] },
            FixedFetcher {
                text: String::new(),
                calls: Mutex::new(0),
            },
        );

        let bundle = agent.answer_question("q").await;
        assert_eq!(bundle.sources, vec!["No relevant websites found.".to_string()]);
        assert_eq!(
            bundle.web,
            "Could not find relevant websites for this question."
        );
    }
}
