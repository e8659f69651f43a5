//! Remote service clients for cnbchat.
//!
//! Implementations:
//! - **CNB**: knowledge-base search and streaming chat completion against
//!   the CNB OpenAPI
//! - **SSE**: the incremental line decoder behind the completion stream

pub mod cnb;
pub mod sse;

pub use cnb::CnbClient;
pub use sse::{SseDecoder, decode_line};
