//! Knowledge chunks returned by a knowledge-base search.

use serde::{Deserialize, Serialize};

/// A text fragment retrieved from the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub text: String,

    /// Permalink to the source document, when the service provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_link: Option<String>,
}

impl KnowledgeChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reference_link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.reference_link = Some(link.into());
        self
    }
}

/// Collect the reference links of `chunks`, in order.
pub fn reference_links(chunks: &[KnowledgeChunk]) -> Vec<String> {
    chunks
        .iter()
        .filter_map(|c| c.reference_link.clone())
        .collect()
}
