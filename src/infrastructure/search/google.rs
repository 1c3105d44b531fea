use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ports::WebSearch, DomainError, SearchHit};
use crate::infrastructure::config::SearchConfig;

/// Google Custom Search JSON API client. Credentials come from config
/// (`GOOGLE_API_KEY` / `GOOGLE_CSE_ID`); without them every search fails
/// as an external-service error and the caller degrades the web source.
pub struct GoogleSearch {
    api_key: Option<String>,
    engine_id: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl GoogleSearch {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            engine_id: config.engine_id.clone(),
            timeout: Duration::from_secs(config.timeout_or_default()),
            client: reqwest::Client::new(),
        }
    }
}

fn parse_items(payload: &Value) -> Vec<SearchHit> {
    let items = payload
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut results = Vec::new();
    for item in items {
        let title = item
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let url = item
            .get("link")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let snippet = item
            .get("snippet")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        if !title.is_empty() && !url.is_empty() {
            results.push(SearchHit {
                title,
                url,
                snippet,
            });
        }
    }

    results
}

#[async_trait]
impl WebSearch for GoogleSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, DomainError> {
        let (api_key, engine_id) = match (&self.api_key, &self.engine_id) {
            (Some(key), Some(id)) => (key, id),
            _ => {
                return Err(DomainError::external(
                    "Google API credentials are not configured",
                ))
            }
        };

        let url = format!(
            "https://www.googleapis.com/customsearch/v1?key={}&cx={}&num={}&q={}",
            api_key,
            engine_id,
            limit,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DomainError::external(format!(
                "Google search failed: {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(parse_items(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_items_extracts_hits() {
        let payload = json!({
            "items": [
                {"title": "Derivatives", "link": "https://a.example", "snippet": "calc"},
                {"title": "", "link": "https://dropped.example"},
                {"title": "No link"},
                {"title": "Second", "link": "https://b.example"}
            ]
        });

        let hits = parse_items(&payload);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://a.example");
        assert_eq!(hits[0].snippet, "calc");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn test_parse_items_no_items_key() {
        assert!(parse_items(&json!({})).is_empty());
    }

    #[tokio::test]
    async fn test_search_without_credentials_errors() {
        let search = GoogleSearch::from_config(&SearchConfig::default());
        let err = search.search("q", 5).await.unwrap_err();
        assert!(matches!(err, DomainError::ExternalService(_)));
    }
}
