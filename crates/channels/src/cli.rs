//! CLI channel: an interactive terminal session.
//!
//! Reads one command per line from stdin and prints every reply to
//! stdout. Used by `cnbchat chat`.

use async_trait::async_trait;
use cnbchat_core::channel::{Channel, ChannelId, ChannelMessage};
use cnbchat_core::error::ChannelError;
use std::io::Write;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// Chat id of the single terminal conversation.
pub const CLI_CHAT_ID: &str = "cli_session";

/// What a line typed at the prompt means.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Blank,
    Exit,
    Command(String),
}

fn classify(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
        return Line::Exit;
    }
    Line::Command(line.to_string())
}

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("cli".into()),
        }
    }

    fn message(&self, content: String) -> ChannelMessage {
        ChannelMessage {
            channel_id: self.id.clone(),
            sender_id: "local_user".into(),
            sender_name: Some("User".into()),
            content,
            chat_id: CLI_CHAT_ID.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Write one reply followed by a newline.
fn write_reply<W: Write>(out: &mut W, content: &str) -> Result<(), ChannelError> {
    writeln!(out, "{content}")
        .and_then(|()| out.flush())
        .map_err(|e| ChannelError::DeliveryFailed {
            channel: "cli".into(),
            reason: e.to_string(),
        })
}

/// Forward commands from `reader` until EOF, an exit word, or the
/// receiver going away.
async fn pump<R>(
    reader: R,
    channel_id: ChannelId,
    tx: mpsc::Sender<Result<ChannelMessage, ChannelError>>,
) where
    R: AsyncBufRead + Unpin,
{
    let template = CliChannel { id: channel_id };
    let mut lines = reader.lines();

    loop {
        match lines.next_line().await {
            Ok(Some(raw)) => match classify(&raw) {
                Line::Blank => continue,
                Line::Exit => break,
                Line::Command(content) => {
                    if tx.send(Ok(template.message(content))).await.is_err() {
                        break;
                    }
                }
            },
            Ok(None) => break, // EOF (Ctrl+D)
            Err(e) => {
                let _ = tx
                    .send(Err(ChannelError::ConnectionLost(e.to_string())))
                    .await;
                break;
            }
        }
    }
    debug!("CLI input closed");
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();

        tokio::spawn(pump(BufReader::new(io::stdin()), channel_id, tx));

        Ok(rx)
    }

    async fn send(&self, _chat_id: &str, content: &str) -> Result<(), ChannelError> {
        write_reply(&mut std::io::stdout().lock(), content)
    }
}
