use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::domain::{ports::PageFetcher, DomainError};
use crate::infrastructure::config::ScrapeConfig;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

// Elements that never carry article text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "form", "button", "input", "select",
    "textarea", "label", "iframe", "noscript", "img", "svg", "figure", "figcaption",
];

// Preferred content containers, most specific first; body is the fallback.
static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "main",
        "article",
        "div[role=\"main\"]",
        "div#main",
        "div#content",
        "div.content",
        "div.main",
        "body",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

/// Fetches a page and extracts its main text. Returns an empty string for
/// pages that are non-HTML or too thin to be useful; callers treat empty
/// results as a failed scrape.
pub struct HtmlPageFetcher {
    client: reqwest::Client,
    timeout: Duration,
    min_content_chars: usize,
}

impl HtmlPageFetcher {
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(config.timeout_seconds),
            min_content_chars: config.min_content_chars,
        }
    }
}

#[async_trait]
impl PageFetcher for HtmlPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, DomainError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DomainError::external(format!(
                "fetch failed with status {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.contains("html") {
            debug!(%url, %content_type, "skipping non-HTML content");
            return Ok(String::new());
        }

        let body = response
            .text()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        let text = extract_main_text(&body);
        if text.chars().count() < self.min_content_chars {
            debug!(%url, "extracted content too short, dropping");
            return Ok(String::new());
        }

        Ok(text)
    }
}

/// Pulls readable text out of an HTML document, preferring the main
/// content container and skipping script/style/navigation chrome.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let root = CONTENT_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).next());

    let mut out = String::new();
    match root {
        Some(element) => collect_text(element, &mut out),
        None => collect_text(document.root_element(), &mut out),
    }

    BLANK_LINES.replace_all(&out, "\n").trim().to_string()
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push_str(trimmed);
                out.push('\n');
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !SKIP_TAGS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prefers_main_and_skips_chrome() {
        let html = r#"
            <html><body>
              <nav>Navigation links</nav>
              <main>
                <h1>Derivatives</h1>
                <p>The derivative measures the rate of change.</p>
                <script>var tracking = true;</script>
              </main>
              <footer>Copyright</footer>
            </body></html>
        "#;

        let text = extract_main_text(html);
        assert!(text.contains("Derivatives"));
        assert!(text.contains("rate of change"));
        assert!(!text.contains("Navigation"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_extract_falls_back_to_body() {
        let html = "<html><body><p>Just a paragraph.</p></body></html>";
        assert_eq!(extract_main_text(html), "Just a paragraph.");
    }

    #[test]
    fn test_extract_collapses_blank_lines() {
        let html = "<html><body><main><p>One</p><p></p><p>Two</p></main></body></html>";
        assert_eq!(extract_main_text(html), "One\nTwo");
    }

    #[test]
    fn test_extract_empty_document() {
        assert_eq!(extract_main_text(""), "");
    }
}
