//! The final answer produced from a completion stream.

use serde::{Deserialize, Serialize};

/// A completed answer, split into its reasoning and user-facing parts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Answer {
    /// Content of the `<think>` block, if the model produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,

    /// The user-facing answer body
    pub final_text: String,

    /// Reference links from the knowledge chunks, in retrieval order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}
