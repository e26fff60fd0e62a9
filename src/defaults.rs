//! Default configuration constants for verifact.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech pipelines and matches what the upstream
/// conversational service expects for inbound microphone audio.
pub const SAMPLE_RATE: u32 = 16000;

/// Default audio frame size in samples.
///
/// At 16kHz a 4096-sample frame is 256ms of audio, the granularity at which
/// the gate makes its forward/suppress decision.
pub const FRAME_SIZE: usize = 4096;

/// Default Voice Activity Detection (VAD) threshold.
///
/// RMS-based threshold (0.0 to 1.0) applied to the smoothed level. 0.05 is
/// tuned for normalized float microphone input and rejects room noise while
/// staying sensitive to quiet speech.
pub const VAD_THRESHOLD: f32 = 0.05;

/// Default VAD release smoothing factor (0.0 to 1.0).
///
/// Higher values make the smoothed level decay more slowly after speech.
/// Attack is not smoothed at all: a loud frame raises the level instantly.
pub const VAD_SMOOTHING: f32 = 0.9;

/// Default trailing hold window in milliseconds.
///
/// Frames keep being forwarded for this long after the level drops below the
/// threshold, so word endings are not clipped.
pub const VAD_HOLD_MS: u32 = 300;

/// Interval between silence progress logs in milliseconds.
///
/// While the gate is suppressing, a debug line with the suppressed-frame count
/// is emitted at most this often.
pub const SILENCE_LOG_INTERVAL_MS: u32 = 5000;

/// Interval between keepalive prompts in milliseconds.
///
/// While suppressing, `poll_keepalive` reports true at most once per interval
/// so the caller can send a short silence frame and keep the upstream
/// connection engaged during long pauses.
pub const KEEPALIVE_INTERVAL_MS: u32 = 1000;

/// Marker character that introduces a structured confidence envelope.
pub const STRUCTURED_MARKER: char = '§';

/// First word of a verifier response meaning "unverifiable, suppress output".
///
/// Compared case-insensitively against the response's first word.
pub const SKIP_WORD: &str = "skip";

/// First word of a verifier response meaning "answer already accurate".
///
/// Compared case-insensitively against the response's first word.
pub const CORRECT_WORD: &str = "correct";

/// Sentinel stored as a fact's verified value when the answer was confirmed.
pub const CORRECT_SENTINEL: &str = "CORRECT";

/// Characters of response buffered before classification gives up waiting
/// for a word boundary and starts displaying.
pub const CLASSIFY_PROBE_CHARS: usize = 10;

/// Delay in milliseconds between one verification completing and the next
/// dispatch. Cooperative pacing, not a rate limit.
pub const VERIFY_PACING_MS: u64 = 100;

/// Delay in milliseconds before the next dispatch after a failed
/// verification. Longer than the success pacing to back off a struggling
/// service.
pub const VERIFY_FAILURE_PACING_MS: u64 = 500;

/// Default host for the verification service.
pub const API_HOST: &str = "generativelanguage.googleapis.com";

/// Default verification model identifier.
pub const VERIFICATION_MODEL: &str = "models/gemini-2.5-pro";

/// Maximum tokens requested per verification response.
pub const MAX_OUTPUT_TOKENS: u32 = 2048;

/// Capacity of the per-verification delta channel.
///
/// Deltas are short text fragments; the consumer classifies them faster than
/// any realistic stream produces them, so a small buffer is plenty.
pub const STREAM_CHANNEL_CAPACITY: usize = 64;

/// System instruction sent with every verification request.
///
/// The CORRECT response convention the classifier relies on is established
/// here; SKIP is the service's own convention for unanswerable questions.
/// Overriding prompts must preserve the CORRECT contract.
pub const VERIFICATION_SYSTEM_PROMPT: &str = "\
Your role is to verify factual claims. You will receive:
- A factual question
- The user's stated answer

Respond with EITHER:
1. \"CORRECT\" if the answer is 100% accurate
2. The correct fact if the answer is inaccurate or incomplete

Be concise and factual. Use available tools (Google Search, Code Execution) to verify.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_words_are_lowercase() {
        // Classification lowercases the first word before comparing.
        assert_eq!(SKIP_WORD, SKIP_WORD.to_lowercase());
        assert_eq!(CORRECT_WORD, CORRECT_WORD.to_lowercase());
    }

    #[test]
    fn stored_sentinel_matches_compare_word() {
        assert!(CORRECT_SENTINEL.eq_ignore_ascii_case(CORRECT_WORD));
    }

    #[test]
    fn system_prompt_states_correct_convention() {
        assert!(VERIFICATION_SYSTEM_PROMPT.contains("\"CORRECT\""));
    }
}
