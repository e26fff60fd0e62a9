//! Renderer boundary.
//!
//! The pipeline never prints; it drives a [`ResponseSink`]. A sink owns at
//! most one open response surface at a time. Verification answers stream
//! into it delta by delta, which is why classification happens before the
//! first [`ResponseSink::begin`]: once text reaches a sink it cannot be
//! taken back.

use std::io::{self, Write};

use log::debug;

/// Receives display output and verification completion events.
pub trait ResponseSink: Send {
    /// Opens a fresh response surface.
    fn begin(&mut self);

    /// Streams text into the current surface, opening one if none is open.
    fn append(&mut self, text: &str);

    /// Commits the current surface.
    fn finalize(&mut self);

    /// Drops a surface that was opened but never committed.
    fn discard(&mut self);

    /// A verification finished for `number`. `display` carries the rendered
    /// text when something was shown, `None` for silent outcomes.
    fn fact_verified(&mut self, _number: u32, _display: Option<&str>) {}

    fn name(&self) -> &str {
        "sink"
    }
}

/// Streams responses to stdout; one committed surface per line.
#[derive(Debug, Default)]
pub struct StdoutSink {
    wrote: bool,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn end_line(&mut self) {
        if self.wrote {
            println!();
        }
        self.wrote = false;
    }
}

impl ResponseSink for StdoutSink {
    fn begin(&mut self) {
        self.end_line();
    }

    fn append(&mut self, text: &str) {
        print!("{text}");
        let _ = io::stdout().flush();
        self.wrote = true;
    }

    fn finalize(&mut self) {
        self.end_line();
    }

    fn discard(&mut self) {
        // Whatever already hit the terminal stays; just terminate the line.
        self.end_line();
    }

    fn fact_verified(&mut self, number: u32, display: Option<&str>) {
        match display {
            Some(text) => debug!("fact {number} verified: {text}"),
            None => debug!("fact {number} resolved silently"),
        }
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

/// Captures sink traffic for assertions.
///
/// Mirrors the renderer it stands in for: an uncommitted surface survives a
/// `finalize` while empty, and a `begin` over an open surface leaves the old
/// content on record.
#[derive(Debug, Default)]
pub struct CollectorSink {
    current: Option<String>,
    responses: Vec<String>,
    verified: Vec<(u32, Option<String>)>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed surfaces, oldest first.
    pub fn responses(&self) -> &[String] {
        &self.responses
    }

    /// Text of the surface still open, if any.
    pub fn open_text(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// `fact_verified` notifications, in arrival order.
    pub fn verified(&self) -> &[(u32, Option<String>)] {
        &self.verified
    }
}

impl ResponseSink for CollectorSink {
    fn begin(&mut self) {
        if let Some(open) = self.current.take() {
            self.responses.push(open);
        }
        self.current = Some(String::new());
    }

    fn append(&mut self, text: &str) {
        match &mut self.current {
            Some(current) => current.push_str(text),
            None => self.current = Some(text.to_string()),
        }
    }

    fn finalize(&mut self) {
        if let Some(current) = self.current.take_if(|c| !c.is_empty()) {
            self.responses.push(current);
        }
    }

    fn discard(&mut self) {
        self.current = None;
    }

    fn fact_verified(&mut self, number: u32, display: Option<&str>) {
        self.verified.push((number, display.map(str::to_string)));
    }

    fn name(&self) -> &str {
        "collector"
    }
}
