//! Input parser: turns one line of user text into a [`Query`].
//!
//! Accepted shapes:
//! - `think on` / `think off`: toggle the think/answer split
//! - `owner/repo question…` or `repo:owner/repo question…`: ask a
//!   specific repository's knowledge base
//! - `question…`: ask the configured default repository

use cnbchat_core::error::{Error, USAGE_HINT};
use cnbchat_core::query::Query;

/// The command word the host registers for this bot.
pub const COMMAND_NAME: &str = "cnb";

const THINK_COMMAND: &str = "think";
const REPO_PREFIX: &str = "repo:";
const THINK_USAGE: &str = "用法：`/cnb think on` 或 `/cnb think off`";

/// Strip a leading `/cnb` command token, if present.
pub fn strip_command(text: &str) -> &str {
    let text = text.trim();
    let (head, rest) = split_first_token(text);
    match head.strip_prefix('/') {
        Some(name) if name.eq_ignore_ascii_case(COMMAND_NAME) => rest,
        _ => text,
    }
}

/// Parse user text into a [`Query`].
///
/// `default_repository` is used when the text does not name one. Usage
/// errors carry the hint shown to the user.
pub fn parse(text: &str, default_repository: &str) -> Result<Query, Error> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Usage(USAGE_HINT.into()));
    }

    let (first, rest) = split_first_token(text);

    if first.eq_ignore_ascii_case(THINK_COMMAND) {
        if rest.eq_ignore_ascii_case("on") {
            return Ok(Query::toggle(true));
        }
        if rest.eq_ignore_ascii_case("off") {
            return Ok(Query::toggle(false));
        }
        if rest.is_empty() {
            return Err(Error::Usage(THINK_USAGE.into()));
        }
        // "think about …" is an ordinary question.
    }

    if let Some(repository) = repository_selector(first) {
        if repository.is_empty() || rest.is_empty() {
            return Err(Error::Usage(USAGE_HINT.into()));
        }
        return Ok(Query::ask(repository, rest));
    }

    Ok(Query::ask(default_repository, text))
}

/// Split on the first whitespace run. The remainder is trimmed.
fn split_first_token(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim()),
        None => (text, ""),
    }
}

/// Recognise an explicit repository token.
fn repository_selector(token: &str) -> Option<&str> {
    if let Some(repository) = token.strip_prefix(REPO_PREFIX) {
        return Some(repository);
    }

    let lower = token.to_ascii_lowercase();
    let is_url = lower.starts_with("http://") || lower.starts_with("https://");
    (token.contains('/') && !is_url).then_some(token)
}
