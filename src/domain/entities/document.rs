use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub source: String,
    pub content: String,
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(source: impl Into<String>, content: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            content: content.into(),
            chunk_index,
            metadata: ChunkMetadata::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Splits content into overlapping chunks on paragraph boundaries.
///
/// Paragraphs are packed until a chunk would exceed `chunk_size`; the next
/// chunk then starts with the last `overlap` characters of the previous one.
/// A single paragraph longer than `chunk_size` is windowed at
/// `chunk_size - overlap` steps. Chunk indexes are sequential from 0.
pub fn split_text(
    source: &str,
    content: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<DocumentChunk> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);
    let paragraphs: Vec<&str> = content
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        if paragraph.chars().count() > chunk_size {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            pieces.extend(window_long_paragraph(paragraph, chunk_size, overlap));
            continue;
        }

        let would_exceed = !current.is_empty()
            && current.chars().count() + paragraph.chars().count() + 2 > chunk_size;

        if would_exceed {
            let tail = char_tail(&current, overlap);
            pieces.push(std::mem::take(&mut current));
            current = tail;
            if !current.is_empty() {
                current.push_str("\n\n");
            }
        }

        if !current.is_empty() && !current.ends_with("\n\n") {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| DocumentChunk::new(source, text, i))
        .collect()
}

fn window_long_paragraph(paragraph: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    let step = chunk_size - overlap;
    let mut out = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    out
}

fn char_tail(s: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let count = s.chars().count();
    if count <= n {
        return s.to_string();
    }
    s.chars().skip(count - n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_text_single_chunk() {
        let chunks = split_text("a.pdf", "Hello world.\n\nThis is a test.", 100, 10);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello world.\n\nThis is a test.");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].source, "a.pdf");
    }

    #[test]
    fn test_split_text_multiple_chunks_overlap() {
        let content = "First paragraph here.\n\nSecond paragraph here.\n\nThird paragraph here.";
        let chunks = split_text("a.pdf", content, 30, 8);

        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        // Second chunk starts with the tail of the first.
        let tail = char_tail(&chunks[0].content, 8);
        assert!(chunks[1].content.starts_with(&tail));
    }

    #[test]
    fn test_split_text_windows_oversized_paragraph() {
        let long = "x".repeat(250);
        let chunks = split_text("a.pdf", &long, 100, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 100);
        }
        // Consecutive windows share the overlap region.
        assert_eq!(
            char_tail(&chunks[0].content, 20),
            chunks[1].content.chars().take(20).collect::<String>()
        );
    }

    #[test]
    fn test_split_text_empty() {
        assert!(split_text("a.pdf", "", 100, 10).is_empty());
        assert!(split_text("a.pdf", "   \n\n  ", 100, 10).is_empty());
    }
}
