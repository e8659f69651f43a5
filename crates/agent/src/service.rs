//! The question-answering pipeline behind the `cnb` command.
//!
//! # Flow
//!
//! 1. Parse the user text into a [`Query`]
//! 2. Query the knowledge base for chunks
//! 3. Send a progress message
//! 4. Build the prompt and stream the completion
//! 5. Split the answer, append references, send the messages
//!
//! Every failure is turned into exactly one user-facing message; nothing
//! is propagated to the host.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cnbchat_config::AppConfig;
use cnbchat_core::answer::Answer;
use cnbchat_core::error::{Error, ErrorKind, ProviderError};
use cnbchat_core::knowledge::reference_links;
use cnbchat_core::provider::{CompletionProvider, CompletionRequest, KnowledgeBase};
use cnbchat_core::query::{Query, QueryMode};
use cnbchat_providers::CnbClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::aggregate::{Aggregation, aggregate};
use crate::compose::{STATUS_COMPOSING, THINK_OFF_REPLY, THINK_ON_REPLY, compose};
use crate::reply::ReplySink;
use crate::{parser, prompt, segment};

/// Static settings of a [`ChatService`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Repository used when the question names none
    pub default_repository: String,
    /// Model id for the completion endpoint
    pub model: String,
    /// Initial think-mode state
    pub think_mode: bool,
}

impl From<&AppConfig> for ServiceSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_repository: config.repository.trim().to_string(),
            model: config.model.clone(),
            think_mode: config.think_mode,
        }
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The answer was delivered.
    Answered,
    /// Think mode was switched to the given state.
    ThinkModeChanged(bool),
    /// The caller cancelled; no answer was sent.
    Cancelled,
    /// An error message was sent instead of an answer.
    Failed(ErrorKind),
}

/// Answers questions from a CNB knowledge base.
///
/// The think-mode flag is shared by every invocation on this service and
/// the last toggle wins, whoever sent it. Each invocation reads it once so
/// that its prompt and its reply agree.
pub struct ChatService {
    knowledge: Arc<dyn KnowledgeBase>,
    completions: Arc<dyn CompletionProvider>,
    settings: ServiceSettings,
    think_mode: AtomicBool,
}

impl ChatService {
    pub fn new(
        knowledge: Arc<dyn KnowledgeBase>,
        completions: Arc<dyn CompletionProvider>,
        settings: ServiceSettings,
    ) -> Self {
        let think_mode = AtomicBool::new(settings.think_mode);
        Self {
            knowledge,
            completions,
            settings,
            think_mode,
        }
    }

    /// Build a service talking to the CNB OpenAPI described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let client = Arc::new(CnbClient::from_config(config)?);
        Ok(Self::new(client.clone(), client, ServiceSettings::from(config)))
    }

    pub fn think_mode(&self) -> bool {
        self.think_mode.load(Ordering::SeqCst)
    }

    pub fn set_think_mode(&self, on: bool) {
        self.think_mode.store(on, Ordering::SeqCst);
    }

    /// Handle one command invocation.
    ///
    /// `text` is the user input with the command word already removed.
    /// Messages are pushed to `reply` in order as they become available.
    pub async fn handle(
        &self,
        text: &str,
        reply: &dyn ReplySink,
        cancel: &CancellationToken,
    ) -> Outcome {
        match self.run(text, reply, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let kind = e.kind();
                match kind {
                    ErrorKind::Unexpected => error!(error = %e, "Invocation failed"),
                    _ => warn!(error = %e, ?kind, "Invocation rejected"),
                }
                if let Err(send_err) = reply.send(&e.user_message()).await {
                    warn!(error = %send_err, "Failed to deliver error message");
                }
                Outcome::Failed(kind)
            }
        }
    }

    async fn run(
        &self,
        text: &str,
        reply: &dyn ReplySink,
        cancel: &CancellationToken,
    ) -> Result<Outcome, Error> {
        let query = parser::parse(text, &self.settings.default_repository)?;

        match query.mode {
            QueryMode::SetThinkOn | QueryMode::SetThinkOff => {
                let on = query.mode == QueryMode::SetThinkOn;
                self.set_think_mode(on);
                info!(think_mode = on, "Think mode toggled");
                reply
                    .send(if on { THINK_ON_REPLY } else { THINK_OFF_REPLY })
                    .await?;
                return Ok(Outcome::ThinkModeChanged(on));
            }
            QueryMode::Ask => {}
        }

        if query.repository.is_empty() {
            return Err(Error::missing_repository());
        }

        let think_mode = self.think_mode();
        self.ask(&query, think_mode, reply, cancel).await
    }

    async fn ask(
        &self,
        query: &Query,
        think_mode: bool,
        reply: &dyn ReplySink,
        cancel: &CancellationToken,
    ) -> Result<Outcome, Error> {
        info!(repository = %query.repository, think_mode, "Answering question");

        let chunks = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Outcome::Cancelled),
            result = self.knowledge.query(&query.repository, &query.question) => result?,
        };
        debug!(chunks = chunks.len(), "Knowledge retrieved");

        reply.send(STATUS_COMPOSING).await?;

        let request = CompletionRequest {
            repository: query.repository.clone(),
            model: self.settings.model.clone(),
            prompt: prompt::build(&chunks, &query.question, think_mode),
        };

        let rx = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Outcome::Cancelled),
            result = self.completions.stream(request) => result?,
        };

        let raw = match aggregate(rx, cancel).await? {
            Aggregation::Complete(raw) => raw,
            Aggregation::Cancelled => {
                info!("Invocation cancelled mid-stream");
                return Ok(Outcome::Cancelled);
            }
        };

        if raw.trim().is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }

        let segments = segment::segment(&raw);
        let answer = Answer {
            thinking: segments.thinking,
            final_text: segments.final_text,
            references: reference_links(&chunks),
        };

        for message in compose(&answer, think_mode) {
            reply.send(&message).await?;
        }

        Ok(Outcome::Answered)
    }
}
