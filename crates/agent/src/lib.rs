//! The question-answering pipeline behind the `/cnb` command.
//!
//! An invocation goes through five stages:
//!
//! 1. **Parse** the user text into a repository and a question ([`parser`])
//! 2. **Retrieve** knowledge chunks from the repository's knowledge base
//! 3. **Prompt** the model with the chunks and the question ([`prompt`])
//! 4. **Stream** the completion and collect it ([`aggregate`])
//! 5. **Reply** with the answer, its references and, in think mode, the
//!    model's reasoning ([`segment`], [`compose`])
//!
//! [`ChatService`] drives the stages and turns every failure into one
//! user-facing message.

pub mod aggregate;
pub mod compose;
pub mod parser;
pub mod prompt;
pub mod reply;
pub mod segment;
pub mod service;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use aggregate::{Aggregation, aggregate};
pub use compose::compose;
pub use parser::{COMMAND_NAME, parse, strip_command};
pub use reply::{ChannelReply, ReplySink};
pub use segment::{Segments, segment};
pub use service::{ChatService, Outcome, ServiceSettings};
