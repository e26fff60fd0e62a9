//! Early classification of a streamed verification answer.
//!
//! The verifier answers with a leading sentinel word when there is nothing
//! to show: `SKIP` for unverifiable questions, `CORRECT` for confirmed
//! answers. Everything else is a real answer the user should see as it
//! streams. Display cannot be retracted once begun, so deltas are buffered
//! until the first whitespace-delimited word is complete, with a character
//! cap for answers that start with one long token.
//!
//! The two sentinels latch differently on purpose. `skip` latches the
//! moment it matches, even when the match is a prefix of a longer word
//! still arriving. `correct` is re-derived on every push, so a buffer
//! growing into `Correction needed: ...` flips to normal display.

use log::debug;

use crate::defaults;

/// What the dispatcher should do with the renderer after a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayAction {
    /// Keep buffering; nothing reaches the renderer.
    Hold,
    /// Classification resolved to a visible answer; open a surface and
    /// render everything buffered so far.
    Begin(String),
    /// Display is already running; render this delta as-is.
    Stream(String),
}

/// Final classification once the stream has ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Unverifiable question; drop the fact with no visible output.
    Skipped,
    /// Answer confirmed; record the sentinel, show nothing.
    Correct,
    /// The full response text, whether or not display already began.
    Answer(String),
}

/// Buffers stream deltas until the response can be classified.
#[derive(Debug, Default)]
pub struct StreamClassifier {
    buffer: String,
    display_started: bool,
    skipped: bool,
}

impl StreamClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorbs one delta and reports what may be rendered.
    pub fn push(&mut self, delta: &str) -> DisplayAction {
        self.buffer.push_str(delta);

        if self.skipped {
            return DisplayAction::Hold;
        }
        if self.display_started {
            return DisplayAction::Stream(delta.to_string());
        }

        let trimmed = self.buffer.trim();
        let first = trimmed.split_whitespace().next().unwrap_or("");

        if first.eq_ignore_ascii_case(defaults::SKIP_WORD) {
            debug!("response classified as skip");
            self.skipped = true;
            DisplayAction::Hold
        } else if first.eq_ignore_ascii_case(defaults::CORRECT_WORD) {
            // Provisional; the next push re-derives the first word.
            DisplayAction::Hold
        } else if trimmed.chars().any(char::is_whitespace)
            || trimmed.chars().count() >= defaults::CLASSIFY_PROBE_CHARS
        {
            self.display_started = true;
            DisplayAction::Begin(self.buffer.clone())
        } else {
            DisplayAction::Hold
        }
    }

    /// Resolves the verdict at stream end.
    ///
    /// An unclassified buffer, even a single short word, comes back as
    /// [`Verdict::Answer`] so nothing is dropped silently.
    pub fn finish(self) -> Verdict {
        if self.skipped {
            return Verdict::Skipped;
        }
        let first = self.buffer.trim().split_whitespace().next().unwrap_or("");
        if first.eq_ignore_ascii_case(defaults::CORRECT_WORD) {
            Verdict::Correct
        } else {
            Verdict::Answer(self.buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_with_trailing_text_is_skipped() {
        let mut classifier = StreamClassifier::new();
        assert_eq!(
            classifier.push("SKIP - private question"),
            DisplayAction::Hold
        );
        assert_eq!(classifier.finish(), Verdict::Skipped);
    }

    #[test]
    fn skip_latches_on_a_prefix_push() {
        let mut classifier = StreamClassifier::new();
        assert_eq!(classifier.push("Skip"), DisplayAction::Hold);
        // The word was actually longer, but the latch already fired.
        assert_eq!(classifier.push("ton Castle is in England."), DisplayAction::Hold);
        assert_eq!(classifier.finish(), Verdict::Skipped);
    }

    #[test]
    fn skip_is_case_insensitive() {
        for word in ["skip", "SKIP", "Skip"] {
            let mut classifier = StreamClassifier::new();
            classifier.push(word);
            assert_eq!(classifier.finish(), Verdict::Skipped);
        }
    }

    #[test]
    fn bare_correct_confirms() {
        let mut classifier = StreamClassifier::new();
        assert_eq!(classifier.push("CORRECT"), DisplayAction::Hold);
        assert_eq!(classifier.finish(), Verdict::Correct);
    }

    #[test]
    fn correct_with_trailing_text_still_confirms() {
        let mut classifier = StreamClassifier::new();
        classifier.push("CORRECT");
        assert_eq!(classifier.push(" and well sourced."), DisplayAction::Hold);
        assert_eq!(classifier.finish(), Verdict::Correct);
    }

    #[test]
    fn correct_does_not_latch() {
        let mut classifier = StreamClassifier::new();
        assert_eq!(classifier.push("CORRECT"), DisplayAction::Hold);
        assert_eq!(
            classifier.push("ion needed: 330 meters"),
            DisplayAction::Begin("CORRECTion needed: 330 meters".to_string())
        );
        assert_eq!(
            classifier.finish(),
            Verdict::Answer("CORRECTion needed: 330 meters".to_string())
        );
    }

    #[test]
    fn punctuated_correct_is_an_answer() {
        let mut classifier = StreamClassifier::new();
        classifier.push("CORRECT.");
        assert_eq!(classifier.finish(), Verdict::Answer("CORRECT.".to_string()));
    }

    #[test]
    fn word_boundary_begins_display() {
        let mut classifier = StreamClassifier::new();
        assert_eq!(
            classifier.push("Mars has two moons."),
            DisplayAction::Begin("Mars has two moons.".to_string())
        );
    }

    #[test]
    fn deltas_after_display_stream_verbatim() {
        let mut classifier = StreamClassifier::new();
        classifier.push("Mars has ");
        assert_eq!(
            classifier.push("two moons."),
            DisplayAction::Stream("two moons.".to_string())
        );
        assert_eq!(
            classifier.finish(),
            Verdict::Answer("Mars has two moons.".to_string())
        );
    }

    #[test]
    fn probe_length_begins_display_without_whitespace() {
        let mut classifier = StreamClassifier::new();
        assert_eq!(classifier.push("129381938"), DisplayAction::Hold);
        assert_eq!(
            classifier.push("4"),
            DisplayAction::Begin("1293819384".to_string())
        );
    }

    #[test]
    fn short_unclassified_buffer_holds() {
        let mut classifier = StreamClassifier::new();
        assert_eq!(classifier.push("No"), DisplayAction::Hold);
    }

    #[test]
    fn stream_end_flushes_a_short_answer() {
        let mut classifier = StreamClassifier::new();
        classifier.push("No");
        assert_eq!(classifier.finish(), Verdict::Answer("No".to_string()));
    }

    #[test]
    fn empty_stream_is_an_empty_answer() {
        let classifier = StreamClassifier::new();
        assert_eq!(classifier.finish(), Verdict::Answer(String::new()));
    }

    #[test]
    fn whitespace_only_deltas_hold() {
        let mut classifier = StreamClassifier::new();
        assert_eq!(classifier.push("  "), DisplayAction::Hold);
        assert_eq!(classifier.push(" \n"), DisplayAction::Hold);
    }

    #[test]
    fn leading_whitespace_does_not_hide_skip() {
        let mut classifier = StreamClassifier::new();
        classifier.push("  SKIP for privacy");
        assert_eq!(classifier.finish(), Verdict::Skipped);
    }
}
