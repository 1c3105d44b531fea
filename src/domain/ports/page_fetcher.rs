use crate::domain::errors::DomainError;
use async_trait::async_trait;

/// Fetches a web page and returns its extracted main text. An empty string
/// means the page yielded nothing usable (non-HTML, too short, blocked).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, DomainError>;
}
