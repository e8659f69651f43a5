//! Splits model output into `<think>` reasoning and the `<answer>` body.
//!
//! Both searches take the first non-greedy match, span newlines and are
//! case-sensitive. They are independent of each other: a `<think>` block
//! without an `<answer>` block still yields the reasoning, while the final
//! text falls back to the whole output.

use regex_lite::Regex;
use std::sync::LazyLock;

static ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<answer>(.*?)</answer>").expect("answer pattern is valid"));
static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("think pattern is valid"));

/// The two parts of a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    pub thinking: Option<String>,
    pub final_text: String,
}

/// Split `raw` into its segments.
pub fn segment(raw: &str) -> Segments {
    let final_text = first_capture(&ANSWER_RE, raw).unwrap_or_else(|| raw.trim().to_string());
    let thinking = first_capture(&THINK_RE, raw);

    Segments {
        thinking,
        final_text,
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}
