//! Collects a completion stream into one answer string.

use cnbchat_core::error::ProviderError;
use cnbchat_core::provider::ChunkReceiver;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a completion stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregation {
    /// `[DONE]` was received; holds the full answer text.
    Complete(String),
    /// The invocation was cancelled. Partial text is discarded.
    Cancelled,
}

/// Append every content delta from `rx` until the final chunk arrives.
///
/// On cancellation the receiver is dropped, which makes the reader task
/// close the HTTP connection.
pub async fn aggregate(
    mut rx: ChunkReceiver,
    cancel: &CancellationToken,
) -> Result<Aggregation, ProviderError> {
    let mut answer = String::new();
    let mut deltas = 0usize;

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(deltas, discarded = answer.len(), "Completion cancelled");
                return Ok(Aggregation::Cancelled);
            }
            item = rx.recv() => item,
        };

        match item {
            Some(Ok(chunk)) => {
                if let Some(content) = chunk.content {
                    answer.push_str(&content);
                    deltas += 1;
                }
                if chunk.done {
                    debug!(deltas, chars = answer.chars().count(), "Completion stream finished");
                    return Ok(Aggregation::Complete(answer));
                }
            }
            Some(Err(e)) => return Err(e),
            None => {
                return Err(ProviderError::StreamInterrupted(
                    "completion stream ended without a final chunk".into(),
                ));
            }
        }
    }
}
