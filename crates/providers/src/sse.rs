//! Incremental decoder for `data: {...}` completion streams.
//!
//! Bytes arrive in arbitrary network-sized pieces: a piece may end in the
//! middle of a line, or in the middle of a multi-byte UTF-8 sequence. The
//! [`LineBuffer`] keeps the unterminated tail as raw bytes and only decodes
//! complete lines, so nothing is lost or mangled across reads.

use cnbchat_core::provider::StreamEvent;
use serde::Deserialize;
use tracing::warn;

/// The sentinel that ends a completion stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Longest line kept in memory. Anything longer is dropped unread.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into lines, carrying partial lines across pushes.
///
/// `\n`, `\r\n` and a lone `\r` all end a line. Terminators are not part
/// of the returned lines.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    /// Bytes of `pending` already known to hold no terminator.
    scanned: usize,
    /// Skipping the rest of an oversized line.
    discarding: bool,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            discarding: false,
            limit,
        }
    }

    /// Append `bytes` and return every line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut i = self.scanned;
        while i < self.pending.len() {
            let terminator = match self.pending[i] {
                b'\n' => 1,
                b'\r' => match self.pending.get(i + 1) {
                    Some(b'\n') => 2,
                    Some(_) => 1,
                    // A '\n' may still arrive with the next piece.
                    None => break,
                },
                _ => {
                    i += 1;
                    continue;
                }
            };

            if self.discarding {
                self.discarding = false;
            } else {
                lines.push(String::from_utf8_lossy(&self.pending[start..i]).into_owned());
            }
            i += terminator;
            start = i;
        }

        self.pending.drain(..start);
        self.scanned = i - start;

        if self.pending.len() > self.limit {
            warn!(
                bytes = self.pending.len(),
                limit = self.limit,
                "Dropping oversized stream line"
            );
            self.pending.clear();
            self.scanned = 0;
            self.discarding = true;
        }

        lines
    }

    /// Take whatever is left after the transport closed.
    pub fn take_rest(&mut self) -> Option<String> {
        self.scanned = 0;
        let rest = std::mem::take(&mut self.pending);
        if std::mem::take(&mut self.discarding) || rest.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Decode a single line.
///
/// Returns `None` for lines that carry nothing: blank keep-alives and
/// well-formed events without content.
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let data = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
    if data == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<ChunkPayload>(data) {
        Ok(payload) => payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(StreamEvent::Delta),
        Err(_) => Some(StreamEvent::Malformed),
    }
}

/// Stateful stream decoder: line buffering plus per-line decoding.
///
/// Once [`StreamEvent::Done`] has been produced the decoder is finished and
/// ignores any further input.
#[derive(Debug, Default)]
pub struct SseDecoder {
    lines: LineBuffer,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a piece of the response body.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let lines = self.lines.push(bytes);
        self.decode_all(lines)
    }

    /// Flush the trailing unterminated line once the transport has closed.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let rest = self.lines.take_rest();
        self.decode_all(rest)
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn decode_all(&mut self, lines: impl IntoIterator<Item = String>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for line in lines {
            match decode_line(&line) {
                Some(StreamEvent::Done) => {
                    events.push(StreamEvent::Done);
                    self.finished = true;
                    break;
                }
                Some(event) => events.push(event),
                None => {}
            }
        }
        events
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}
