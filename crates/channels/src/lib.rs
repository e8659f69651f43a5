//! Chat channel implementations for cnbchat.
//!
//! A channel connects cnbchat to a chat surface: it yields the user's
//! commands and carries the replies back. Only the terminal channel ships
//! here; platform hosts implement [`cnbchat_core::Channel`] themselves.

pub mod cli;

pub use cli::CliChannel;
