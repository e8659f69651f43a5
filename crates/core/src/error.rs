//! Error types for the cnbchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Every error that
//! reaches the top of an invocation is classified into an [`ErrorKind`]
//! and rendered as a single user-facing message.

use thiserror::Error;

/// The top-level error type for all cnbchat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- User input ---
    #[error("Usage error: {0}")]
    Usage(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Remote services ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Coarse classification of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing user input.
    Usage,
    /// Missing token or repository.
    Configuration,
    /// Non-2xx response from one of the remote endpoints.
    RemoteRequest,
    /// The knowledge base answered with an unexpected shape.
    Format,
    /// Anything else: network faults, timeouts, decode failures.
    Unexpected,
}

/// Which remote endpoint produced an [`ProviderError::ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Knowledge,
    Completion,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Knowledge => write!(f, "knowledge query"),
            Endpoint::Completion => write!(f, "chat completion"),
        }
    }
}

pub const USAGE_HINT: &str =
    "请在指令后提供问题，例如 `/cnb 你的问题` 或 `/cnb owner/repo 你的问题`";
const MISSING_TOKEN: &str = "插件未配置 token";
const MISSING_REPOSITORY: &str = "插件未配置 repo";
const BAD_FORMAT: &str = "知识库返回格式错误";
const TIMED_OUT: &str = "请求超时，请稍后重试";
const EMPTY_ANSWER: &str = "AI 未返回任何内容";
const GENERIC_FAILURE: &str = "处理失败";

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Usage(_) => ErrorKind::Usage,
            Error::Config { .. } => ErrorKind::Configuration,
            Error::Provider(e) => e.kind(),
            Error::Channel(_) => ErrorKind::Unexpected,
        }
    }

    /// Render the message shown to the end user.
    ///
    /// Only remote request failures echo server detail (status and body);
    /// everything else uses a fixed sentence so internals stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::Usage(hint) => hint.clone(),
            Error::Config { message } => message.clone(),
            Error::Provider(e) => e.user_message(),
            Error::Channel(_) => GENERIC_FAILURE.into(),
        }
    }

    pub fn missing_repository() -> Self {
        Error::Config {
            message: MISSING_REPOSITORY.into(),
        }
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{endpoint} request failed: {message} (status: {status_code})")]
    ApiError {
        endpoint: Endpoint,
        status_code: u16,
        message: String,
    },

    #[error("Unexpected response format: {0}")]
    InvalidFormat(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Model returned an empty answer")]
    EmptyResponse,
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::ApiError { .. } => ErrorKind::RemoteRequest,
            ProviderError::InvalidFormat(_) => ErrorKind::Format,
            ProviderError::NotConfigured(_) => ErrorKind::Configuration,
            _ => ErrorKind::Unexpected,
        }
    }

    fn user_message(&self) -> String {
        match self {
            ProviderError::ApiError {
                endpoint,
                status_code,
                message,
            } => {
                let prefix = match endpoint {
                    Endpoint::Knowledge => "查询失败",
                    Endpoint::Completion => "AI 请求失败",
                };
                format!("{prefix}: {status_code} {message}")
            }
            ProviderError::InvalidFormat(_) => BAD_FORMAT.into(),
            ProviderError::NotConfigured(what) if what == "repository" => {
                MISSING_REPOSITORY.into()
            }
            ProviderError::NotConfigured(_) => MISSING_TOKEN.into(),
            ProviderError::Timeout(_) => TIMED_OUT.into(),
            ProviderError::EmptyResponse => EMPTY_ANSWER.into(),
            _ => GENERIC_FAILURE.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),
}
