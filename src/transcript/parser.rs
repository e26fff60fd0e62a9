//! Fact-protocol line tokenizer.
//!
//! The checker model marks extracted facts with numbered lines:
//!
//! ```text
//! Q7: How tall is the Eiffel Tower?
//! A7: 330 meters
//! ```
//!
//! Everything else is ordinary display text. Matching is an explicit
//! prefix-digits-colon scan; the kind letter must be an uppercase `Q` or `A`
//! and the remainder after the colon must be non-empty once trimmed.

use log::debug;

/// Classification of a single transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineToken {
    /// `Q<n>: <text>` with a non-empty question.
    Question { number: u32, text: String },
    /// `A<n>: <text>` with a non-empty answer.
    Answer { number: u32, text: String },
    /// Anything else; shown to the user, never stored.
    Plain,
}

/// Stateful tokenizer; tracks the highest fact number seen so unnumbered
/// sources can be assigned fresh numbers.
#[derive(Debug)]
pub struct FactParser {
    next_number: u32,
}

impl FactParser {
    pub fn new() -> Self {
        Self { next_number: 1 }
    }

    /// Classifies one line. Fact numbers observed here feed
    /// [`FactParser::take_next_number`].
    pub fn parse_line(&mut self, line: &str) -> LineToken {
        let token = classify(line);
        if let LineToken::Question { number, .. } | LineToken::Answer { number, .. } = token {
            self.next_number = self.next_number.max(number.saturating_add(1));
        }
        token
    }

    /// Allocates the next unused fact number.
    pub fn take_next_number(&mut self) -> u32 {
        let number = self.next_number;
        self.next_number = self.next_number.saturating_add(1);
        number
    }
}

impl Default for FactParser {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(line: &str) -> LineToken {
    let trimmed = line.trim();
    let mut chars = trimmed.chars();
    let question = match chars.next() {
        Some('Q') => true,
        Some('A') => false,
        _ => return LineToken::Plain,
    };
    let rest = chars.as_str();

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return LineToken::Plain;
    }
    let Some(tail) = rest[digits_end..].strip_prefix(':') else {
        return LineToken::Plain;
    };
    let text = tail.trim();
    if text.is_empty() {
        return LineToken::Plain;
    }
    let Ok(number) = rest[..digits_end].parse::<u32>() else {
        debug!("fact number out of range, treating as plain: {trimmed}");
        return LineToken::Plain;
    };

    let text = text.to_string();
    if question {
        LineToken::Question { number, text }
    } else {
        LineToken::Answer { number, text }
    }
}
