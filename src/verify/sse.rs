//! SSE decoding for the streamed verification response.
//!
//! The verifier streams `data:` lines, each carrying a JSON payload with the
//! next response fragment. Network chunks cut lines anywhere, so a partial
//! line is held until its newline arrives. Payloads that fail to decode are
//! skipped; the service intersperses housekeeping lines the pipeline does
//! not care about.

use serde::Deserialize;

/// One decoded response fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseDelta {
    pub text: String,
    /// The payload carried grounding metadata (the verifier cited search).
    pub grounded: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Reassembles SSE lines from raw stream chunks and decodes the payloads.
#[derive(Debug, Default)]
pub struct SseParser {
    pending: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network chunk; returns the deltas completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<SseDelta> {
        self.pending.push_str(chunk);
        let mut deltas = Vec::new();
        while let Some(newline) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=newline).collect();
            if let Some(delta) = decode_line(line.trim_end_matches(['\r', '\n'])) {
                deltas.push(delta);
            }
        }
        deltas
    }

    /// Decodes a final unterminated line once the stream has ended.
    pub fn finish(&mut self) -> Option<SseDelta> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        decode_line(line.trim_end_matches('\r'))
    }
}

fn decode_line(line: &str) -> Option<SseDelta> {
    let payload = line.strip_prefix("data: ")?;
    if payload == "[DONE]" {
        return None;
    }
    let chunk: StreamChunk = serde_json::from_str(payload).ok()?;
    let candidate = chunk.candidates.into_iter().next()?;
    let grounded = candidate.grounding_metadata.is_some();
    let text = candidate
        .content
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text);
    match (text, grounded) {
        (None, false) => None,
        (text, grounded) => Some(SseDelta {
            text: text.unwrap_or_default(),
            grounded,
        }),
    }
}
