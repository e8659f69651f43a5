//! A parsed user command.

use serde::{Deserialize, Serialize};

/// What the user asked the bot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Answer a question from the knowledge base.
    Ask,
    /// Turn the think/answer split on.
    SetThinkOn,
    /// Turn the think/answer split off.
    SetThinkOff,
}

/// A user command after parsing.
///
/// `question` is non-empty whenever `mode` is [`QueryMode::Ask`]. For the
/// toggle modes both strings are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub repository: String,
    pub question: String,
    pub mode: QueryMode,
}

impl Query {
    pub fn ask(repository: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            question: question.into(),
            mode: QueryMode::Ask,
        }
    }

    pub fn toggle(on: bool) -> Self {
        Self {
            repository: String::new(),
            question: String::new(),
            mode: if on {
                QueryMode::SetThinkOn
            } else {
                QueryMode::SetThinkOff
            },
        }
    }
}
