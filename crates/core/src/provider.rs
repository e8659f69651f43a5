//! Provider traits: the abstraction over the two remote services.
//!
//! [`KnowledgeBase`] searches a repository's knowledge base for chunks,
//! [`CompletionProvider`] streams a chat completion for a prompt. The CNB
//! HTTP client implements both; tests substitute scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::knowledge::KnowledgeChunk;

/// A single streaming completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Repository slug the completion endpoint is scoped to (e.g. "cnb/docs")
    pub repository: String,

    /// The model to use (e.g. "gpt-3.5-turbo")
    pub model: String,

    /// The fully rendered prompt, sent as a single user message
    pub prompt: String,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk (the `[DONE]` sentinel was seen)
    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            done: false,
        }
    }

    pub fn done() -> Self {
        Self {
            content: None,
            done: true,
        }
    }
}

/// One decoded line of a completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Non-empty content to append to the answer.
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
    /// A line that could not be parsed; ignored.
    Malformed,
}

/// Receiver half of a completion stream.
pub type ChunkReceiver =
    tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// Knowledge-base search.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Search `repository`'s knowledge base for chunks relevant to `question`.
    async fn query(
        &self,
        repository: &str,
        question: &str,
    ) -> std::result::Result<Vec<KnowledgeChunk>, ProviderError>;
}

/// Streaming chat completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Open a completion stream.
    ///
    /// A non-2xx response is returned as an error before any chunk is
    /// produced. Dropping the receiver closes the underlying connection.
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_constructors() {
        assert_eq!(StreamChunk::delta("Hel").content.as_deref(), Some("Hel"));
        assert!(!StreamChunk::delta("Hel").done);
        assert!(StreamChunk::done().done);
        assert!(StreamChunk::done().content.is_none());
    }

    #[test]
    fn completion_request_serialization() {
        let req = CompletionRequest {
            repository: "cnb/docs".into(),
            model: "gpt-3.5-turbo".into(),
            prompt: "hi".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("cnb/docs"));
    }
}
