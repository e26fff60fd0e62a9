//! Structured-confidence protocol scanner.
//!
//! In this protocol the upstream model does not emit `Q<n>:`/`A<n>:` lines.
//! Instead, when it is unsure of a claim it embeds a marker character (`§`)
//! followed by a JSON object directly in the response stream:
//!
//! ```text
//! The tower is quite tall.§{"question": "How tall is the Eiffel Tower?"}
//! ```
//!
//! Text before the marker is ordinary display text. After the marker, bytes
//! up to the first `{` are discarded, then the object is captured by brace
//! counting until the depth returns to zero. Trailing text after the closing
//! brace goes back through the scanner, so one chunk can carry plain text and
//! several envelopes. Chunks may split anywhere, including mid-marker span.
//!
//! Brace counting is textual: a `{` or `}` inside a JSON string literal
//! shifts the depth and can close the envelope early. Known limitation of
//! the wire protocol.

use log::warn;
use serde::Deserialize;

use crate::defaults;

/// Payload of one confidence envelope.
///
/// Both long and short field spellings occur in the wild. An object with no
/// usable question is a "no concern" signal and triggers nothing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default, alias = "q")]
    pub question: Option<String>,
    #[serde(default, alias = "c")]
    pub confidence: Option<f64>,
}

impl Envelope {
    /// The question to verify, if the envelope carries one.
    pub fn question(&self) -> Option<&str> {
        self.question.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// One scanner output.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeEvent {
    /// Display text outside any envelope.
    Text(String),
    /// A complete, decoded envelope.
    Envelope(Envelope),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Plain,
    AwaitBrace,
    Collecting,
}

/// Incremental scanner for the marker-plus-JSON protocol.
#[derive(Debug)]
pub struct EnvelopeScanner {
    mode: Mode,
    depth: u32,
    buf: String,
}

impl EnvelopeScanner {
    pub fn new() -> Self {
        Self {
            mode: Mode::Plain,
            depth: 0,
            buf: String::new(),
        }
    }

    /// Feeds a chunk through the scanner and returns the events it produced,
    /// in stream order.
    pub fn push(&mut self, chunk: &str) -> Vec<EnvelopeEvent> {
        let mut events = Vec::new();
        let mut plain = String::new();

        for ch in chunk.chars() {
            match self.mode {
                Mode::Plain => {
                    if ch == defaults::STRUCTURED_MARKER {
                        if !plain.is_empty() {
                            events.push(EnvelopeEvent::Text(std::mem::take(&mut plain)));
                        }
                        self.mode = Mode::AwaitBrace;
                    } else {
                        plain.push(ch);
                    }
                }
                Mode::AwaitBrace => {
                    // Bytes between the marker and the object are dropped.
                    if ch == '{' {
                        self.mode = Mode::Collecting;
                        self.depth = 1;
                        self.buf.clear();
                        self.buf.push(ch);
                    }
                }
                Mode::Collecting => {
                    self.buf.push(ch);
                    match ch {
                        '{' => self.depth += 1,
                        '}' => {
                            self.depth -= 1;
                            if self.depth == 0 {
                                self.complete(&mut events);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if !plain.is_empty() {
            events.push(EnvelopeEvent::Text(plain));
        }
        events
    }

    /// True while a marker has been seen but its object has not closed.
    pub fn mid_envelope(&self) -> bool {
        self.mode != Mode::Plain
    }

    /// Drops any partially collected envelope.
    pub fn reset(&mut self) {
        self.mode = Mode::Plain;
        self.depth = 0;
        self.buf.clear();
    }

    fn complete(&mut self, events: &mut Vec<EnvelopeEvent>) {
        match serde_json::from_str::<Envelope>(&self.buf) {
            Ok(envelope) => events.push(EnvelopeEvent::Envelope(envelope)),
            Err(err) => warn!("dropping malformed confidence envelope: {err}"),
        }
        self.buf.clear();
        self.mode = Mode::Plain;
    }
}

impl Default for EnvelopeScanner {
    fn default() -> Self {
        Self::new()
    }
}
