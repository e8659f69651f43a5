//! # cnbchat Core
//!
//! Domain types, traits, and error definitions for cnbchat, a
//! knowledge-base question-answering front-end.
//! This crate has **zero framework dependencies**; it defines the domain model
//! that all other crates implement against.
//!
//! The two remote services and the hosting chat platform are traits here;
//! implementations live in their respective crates, and tests swap in
//! scripted fakes.

pub mod answer;
pub mod channel;
pub mod error;
pub mod knowledge;
pub mod provider;
pub mod query;

// Re-export key types at crate root for ergonomics
pub use answer::Answer;
pub use channel::{Channel, ChannelId, ChannelMessage};
pub use error::{ChannelError, Endpoint, Error, ErrorKind, ProviderError};
pub use knowledge::KnowledgeChunk;
pub use provider::{
    ChunkReceiver, CompletionProvider, CompletionRequest, KnowledgeBase, StreamChunk, StreamEvent,
};
pub use query::{Query, QueryMode};
