use std::path::Path;

use tracing::warn;

use crate::application::TextExtractor;
use crate::domain::DomainError;

/// PDF text extraction via lopdf. Pages that fail to decode are skipped;
/// the document only errors when no page yields readable text.
#[derive(Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, DomainError> {
        let document = lopdf::Document::load(path)
            .map_err(|e| DomainError::internal(format!("failed to parse PDF: {e}")))?;

        let mut out = String::new();
        for (page_no, _page_id) in document.get_pages() {
            match document.extract_text(&[page_no]) {
                Ok(text) if !text.trim().is_empty() => {
                    out.push_str(text.trim());
                    out.push_str("\n\n");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(page = page_no, error = %e, "skipping unreadable page");
                }
            }
        }

        if out.trim().is_empty() {
            return Err(DomainError::internal(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_errors() {
        let extractor = PdfTextExtractor;
        let err = extractor
            .extract_text(Path::new("/nonexistent/file.pdf"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[test]
    fn test_non_pdf_bytes_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a.pdf");
        std::fs::write(&path, b"plain text, not a pdf").unwrap();

        let extractor = PdfTextExtractor;
        assert!(extractor.extract_text(&path).is_err());
    }
}
