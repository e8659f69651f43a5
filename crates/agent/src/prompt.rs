//! Retrieval-augmented prompt construction.

use cnbchat_core::knowledge::KnowledgeChunk;

/// Render the prompt sent to the completion endpoint.
///
/// Chunk texts are joined by a blank line. With `wants_tags` the model is
/// asked to put its reasoning in `<think>` and the reply in `<answer>`.
pub fn build(chunks: &[KnowledgeChunk], question: &str, wants_tags: bool) -> String {
    let knowledge = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = format!(
        "基于以下知识库内容回答用户问题：\n\
         知识库内容：\n\
         {knowledge}\n\
         用户问题：{question}\n\
         请基于上述知识库内容，准确、详细地回答用户的问题。如果知识库中没有相关信息，请明确说明。\n"
    );

    if wants_tags {
        prompt.push_str(
            "请先在 <think></think> 标签中写出你的分析和推理过程，\
             然后在 <answer></answer> 标签中给出最终回答。\n\
             在 <answer> 的最后，请添加一个\"参考资料\"部分，列出回答中引用的相关资料链接。\n\
             输出格式：<think>推理过程</think><answer>最终回答</answer>\n",
        );
    } else {
        prompt.push_str("在回答的最后，请添加一个\"参考资料\"部分，列出回答中引用的相关资料链接。\n");
    }

    prompt
}
