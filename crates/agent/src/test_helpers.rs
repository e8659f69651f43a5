//! Scripted stand-ins for the two remote services.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use cnbchat_core::error::ProviderError;
use cnbchat_core::knowledge::KnowledgeChunk;
use cnbchat_core::provider::{
    ChunkReceiver, CompletionProvider, CompletionRequest, KnowledgeBase, StreamChunk,
};
use tokio::sync::{Notify, mpsc};

/// A knowledge base that returns the same result for every query.
pub struct ScriptedKnowledge {
    result: Result<Vec<KnowledgeChunk>, ProviderError>,
    calls: AtomicUsize,
    last_repository: Mutex<Option<String>>,
}

impl ScriptedKnowledge {
    pub fn ok(chunks: Vec<KnowledgeChunk>) -> Self {
        Self::with_result(Ok(chunks))
    }

    pub fn err(error: ProviderError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<Vec<KnowledgeChunk>, ProviderError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
            last_repository: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_repository(&self) -> Option<String> {
        self.last_repository.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl KnowledgeBase for ScriptedKnowledge {
    async fn query(
        &self,
        repository: &str,
        _question: &str,
    ) -> Result<Vec<KnowledgeChunk>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_repository.lock().unwrap() = Some(repository.to_string());
        self.result.clone()
    }
}

enum Script {
    Deltas(Vec<String>),
    Fail(ProviderError),
    /// Send one delta, then keep the stream open until the receiver goes away.
    Hang(String),
}

/// A completion provider that plays back a fixed script.
pub struct ScriptedCompletion {
    script: Script,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
    closed: Arc<Notify>,
}

impl ScriptedCompletion {
    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            closed: Arc::new(Notify::new()),
        }
    }

    /// Stream `deltas` followed by the final chunk.
    pub fn text(deltas: &[&str]) -> Self {
        Self::new(Script::Deltas(deltas.iter().map(|d| d.to_string()).collect()))
    }

    /// Reject the request before any chunk is produced.
    pub fn fail(error: ProviderError) -> Self {
        Self::new(Script::Fail(error))
    }

    pub fn hanging(first_delta: &str) -> Self {
        Self::new(Script::Hang(first_delta.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.prompt.clone())
    }

    pub fn last_repository(&self) -> Option<String> {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.repository.clone())
    }

    /// Resolves once a hanging stream has seen its receiver dropped.
    pub async fn closed(&self) {
        self.closed.notified().await;
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkReceiver, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);

        let (tx, rx) = mpsc::channel(16);
        match &self.script {
            Script::Fail(e) => return Err(e.clone()),
            Script::Deltas(deltas) => {
                let deltas = deltas.clone();
                tokio::spawn(async move {
                    for d in deltas {
                        if tx.send(Ok(StreamChunk::delta(d))).await.is_err() {
                            return;
                        }
                    }
                    let _ = tx.send(Ok(StreamChunk::done())).await;
                });
            }
            Script::Hang(first) => {
                let first = first.clone();
                let closed = self.closed.clone();
                tokio::spawn(async move {
                    let _ = tx.send(Ok(StreamChunk::delta(first))).await;
                    tx.closed().await;
                    closed.notify_one();
                });
            }
        }
        Ok(rx)
    }
}
