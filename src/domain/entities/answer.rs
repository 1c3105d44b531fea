use serde::{Deserialize, Serialize};

/// One search-engine hit. Only the url feeds the scraper; title and snippet
/// are kept for the response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// The full result of a multi-source answer: the three candidate answers,
/// the synthesized final answer, and the web source urls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerBundle {
    pub rag: String,
    pub llm: String,
    pub web: String,
    #[serde(rename = "final")]
    pub final_answer: String,
    pub sources: Vec<String>,
}

impl AnswerBundle {
    pub fn empty() -> Self {
        Self {
            rag: String::new(),
            llm: String::new(),
            web: String::new(),
            final_answer: String::new(),
            sources: Vec::new(),
        }
    }
}
