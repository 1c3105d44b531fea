use serde::{Deserialize, Serialize};

/// A tutoring subject. The slug scopes the vector-store collection so each
/// subject's knowledge base stays isolated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub slug: String,
}

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Self { name, slug }
    }

    pub fn collection_name(&self) -> String {
        format!("kb_{}", self.slug)
    }
}

fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_and_collection() {
        let subject = Subject::new("Computer Science");
        assert_eq!(subject.slug, "computer_science");
        assert_eq!(subject.collection_name(), "kb_computer_science");
    }

    #[test]
    fn test_slug_strips_punctuation() {
        assert_eq!(Subject::new("C++ / Systems").slug, "c_____systems");
    }
}
