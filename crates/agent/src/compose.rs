//! Formats an [`Answer`] into the messages sent back to the user.

use cnbchat_core::answer::Answer;

/// Header of the appended references section.
pub const REFERENCES_HEADER: &str = "参考资料:";

/// Progress message sent between the knowledge query and the completion call.
pub const STATUS_COMPOSING: &str = "知识库查询成功，正在生成回答...";

pub const THINK_ON_REPLY: &str = "已开启思考模式";
pub const THINK_OFF_REPLY: &str = "已关闭思考模式";

/// Build the outgoing messages for `answer`.
///
/// With think mode on and reasoning present the reasoning goes first as its
/// own `<think>` message; the answer body (plus references) always goes out
/// wrapped in `<answer>`.
pub fn compose(answer: &Answer, think_mode: bool) -> Vec<String> {
    let mut body = answer.final_text.clone();
    if !answer.references.is_empty() {
        body.push_str("\n\n");
        body.push_str(REFERENCES_HEADER);
        body.push('\n');
        body.push_str(&answer.references.join("\n"));
    }

    let mut messages = Vec::with_capacity(2);
    if think_mode && let Some(thinking) = &answer.thinking {
        messages.push(format!("<think>{thinking}</think>"));
    }
    messages.push(format!("<answer>{body}</answer>"));
    messages
}
