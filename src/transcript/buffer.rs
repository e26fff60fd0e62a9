//! Line re-assembly for streamed transcript text.
//!
//! Upstream messages split lines at arbitrary byte boundaries. The buffer
//! collects chunks and hands back only completed lines, keeping the trailing
//! partial line until a newline or a flush completes it.

/// Accumulates streamed text and yields completed lines.
///
/// The concatenation of every returned line (with newlines reinserted) plus
/// the final flushed remainder reproduces the streamed text exactly.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    pending: String,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns the lines it completed, in order.
    ///
    /// Empty lines are returned like any other; callers decide whether they
    /// matter.
    pub fn append(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        let Some(last_newline) = self.pending.rfind('\n') else {
            return Vec::new();
        };
        let completed = self.pending[..last_newline]
            .split('\n')
            .map(str::to_string)
            .collect();
        self.pending.drain(..=last_newline);
        completed
    }

    /// Takes the trailing partial line, if any. Used at turn completion so a
    /// final unterminated line is still processed.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    /// Current unterminated tail.
    pub fn pending(&self) -> &str {
        &self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_without_newline_completes_nothing() {
        let mut buffer = TranscriptBuffer::new();
        assert!(buffer.append("partial").is_empty());
        assert_eq!(buffer.pending(), "partial");
    }

    #[test]
    fn newline_completes_the_line() {
        let mut buffer = TranscriptBuffer::new();
        assert_eq!(buffer.append("hello\n"), vec!["hello"]);
        assert_eq!(buffer.pending(), "");
    }

    #[test]
    fn line_split_across_chunks() {
        let mut buffer = TranscriptBuffer::new();
        assert!(buffer.append("Q1: How tall ").is_empty());
        assert_eq!(
            buffer.append("is the Eiffel Tower?\n"),
            vec!["Q1: How tall is the Eiffel Tower?"]
        );
    }

    #[test]
    fn multiple_lines_in_one_chunk() {
        let mut buffer = TranscriptBuffer::new();
        assert_eq!(
            buffer.append("Q1: a\nA1: b\ntail"),
            vec!["Q1: a", "A1: b"]
        );
        assert_eq!(buffer.pending(), "tail");
    }

    #[test]
    fn empty_lines_are_preserved() {
        let mut buffer = TranscriptBuffer::new();
        assert_eq!(buffer.append("a\n\nb\n"), vec!["a", "", "b"]);
    }

    #[test]
    fn leading_newline_yields_empty_line() {
        let mut buffer = TranscriptBuffer::new();
        assert_eq!(buffer.append("\n"), vec![""]);
    }

    #[test]
    fn flush_returns_remainder() {
        let mut buffer = TranscriptBuffer::new();
        buffer.append("a\nrest");
        assert_eq!(buffer.flush(), Some("rest".to_string()));
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn flush_after_complete_line_is_empty() {
        let mut buffer = TranscriptBuffer::new();
        buffer.append("done\n");
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn round_trip_is_lossless() {
        let original = "Q1: first\nA1: answer one\n\npartial tail";
        let chunks = ["Q1: fir", "st\nA1: answer", " one\n\npar", "tial tail"];

        let mut buffer = TranscriptBuffer::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(buffer.append(chunk));
        }

        let mut rebuilt = lines.join("\n");
        rebuilt.push('\n');
        if let Some(rest) = buffer.flush() {
            rebuilt.push_str(&rest);
        }
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn round_trip_with_trailing_newline() {
        let original = "one\ntwo\n";
        let mut buffer = TranscriptBuffer::new();
        let lines = buffer.append(original);
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(buffer.flush(), None);
        assert_eq!(format!("{}\n", lines.join("\n")), original);
    }
}
