use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(owner: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "New Chat".to_string(),
            subject: subject.into(),
            owner: owner.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// Caps stored message content, marking the cut so transcripts stay honest.
pub fn truncate_for_storage(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(max_chars).collect();
    truncated.push_str(" ... [truncated]");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_content_unchanged() {
        assert_eq!(truncate_for_storage("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_content_marked() {
        let out = truncate_for_storage("abcdefghij", 4);
        assert_eq!(out, "abcd ... [truncated]");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let out = truncate_for_storage("ééééé", 3);
        assert_eq!(out, "ééé ... [truncated]");
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!(MessageRole::parse("user"), Some(MessageRole::User));
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
        assert_eq!(MessageRole::parse("system"), None);
    }
}
