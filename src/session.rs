//! Session facade wiring the full pipeline together.
//!
//! One `Session` owns the transcript side (buffer, parser or envelope
//! scanner), the shared fact store, the audio gate, and the background
//! verification worker. Embedders feed it transcript chunks and audio
//! frames; verified facts come back through the shared [`ResponseSink`].
//!
//! Dropping the session closes the kick channel and the worker winds down
//! after any in-flight verification; [`Session::close`] aborts it instead.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};

use crate::audio::{GateConfig, VoiceActivityGate};
use crate::config::{Config, Protocol};
use crate::facts::{FactStore, SharedFactStore};
use crate::render::ResponseSink;
use crate::transcript::{
    Envelope, EnvelopeEvent, EnvelopeScanner, FactParser, LineToken, TranscriptBuffer,
};
use crate::verify::{DispatcherHandle, SharedSink, VerificationDispatcher, VerificationTransport};

/// Live conversation pipeline: transcript in, verified facts out.
pub struct Session {
    protocol: Protocol,
    buffer: TranscriptBuffer,
    parser: FactParser,
    scanner: EnvelopeScanner,
    gate: VoiceActivityGate,
    store: SharedFactStore,
    sink: SharedSink,
    worker: DispatcherHandle,
}

impl Session {
    /// Wires the pipeline and spawns the verification worker. Requires a
    /// running tokio runtime.
    pub fn new(
        config: &Config,
        transport: Arc<dyn VerificationTransport>,
        sink: SharedSink,
    ) -> Self {
        let store: SharedFactStore = Arc::new(Mutex::new(FactStore::new()));
        let dispatcher =
            VerificationDispatcher::new(store.clone(), transport, sink.clone(), &config.verify);
        let worker = dispatcher.spawn();
        Self {
            protocol: config.protocol,
            buffer: TranscriptBuffer::new(),
            parser: FactParser::new(),
            scanner: EnvelopeScanner::new(),
            gate: VoiceActivityGate::new(GateConfig::from_config(&config.audio)),
            store,
            sink,
            worker,
        }
    }

    /// Feeds a raw transcript fragment; it may end mid-line or mid-envelope.
    pub fn process_chunk(&mut self, chunk: &str) {
        match self.protocol {
            Protocol::NumberedLines => {
                for line in self.buffer.append(chunk) {
                    self.handle_line(&line);
                }
            }
            Protocol::ConfidenceEnvelope => self.scan(chunk),
        }
    }

    /// Feeds one already-complete line, bypassing the reassembly buffer.
    pub fn process_line(&mut self, line: &str) {
        match self.protocol {
            Protocol::NumberedLines => self.handle_line(line),
            Protocol::ConfidenceEnvelope => self.scan(line),
        }
    }

    /// Ends the conversational turn: flushes the partial tail through the
    /// parser and kicks the verification worker.
    pub fn turn_complete(&mut self) {
        match self.protocol {
            Protocol::NumberedLines => {
                if let Some(tail) = self.buffer.flush() {
                    self.handle_line(&tail);
                }
            }
            Protocol::ConfidenceEnvelope => {
                if self.scanner.mid_envelope() {
                    debug!("turn ended inside a confidence envelope, dropping it");
                    self.scanner.reset();
                }
            }
        }
        self.worker.kick();
    }

    /// Per-frame audio gating; true means forward the frame upstream.
    pub fn should_forward_audio(&mut self, frame: &[f32]) -> bool {
        self.gate.should_forward(frame)
    }

    /// True when a silence keepalive frame is due.
    pub fn poll_keepalive(&mut self) -> bool {
        self.gate.poll_keepalive()
    }

    /// Shared handle to the fact store, for inspection by embedders.
    pub fn store(&self) -> SharedFactStore {
        self.store.clone()
    }

    /// Returns all state to the initial condition. Facts, queue, partial
    /// transcript, partial envelope, and gate state are all discarded.
    pub fn reset(&mut self) {
        self.store_guard().reset();
        self.buffer = TranscriptBuffer::new();
        self.parser = FactParser::new();
        self.scanner.reset();
        self.gate.reset();
        info!("session reset");
    }

    /// Aborts the verification worker, abandoning any in-flight stream, and
    /// clears all verification state.
    pub fn close(&mut self) {
        self.worker.stop();
        self.store_guard().reset();
        info!("session closed");
    }

    fn handle_line(&mut self, line: &str) {
        match self.parser.parse_line(line) {
            LineToken::Question { number, text } => {
                self.store_guard().insert_question(number, &text);
            }
            LineToken::Answer { number, text } => {
                self.store_guard().update_answer(number, &text);
            }
            LineToken::Plain => {
                if !line.trim().is_empty() {
                    // Reinsert the newline the buffer stripped.
                    self.sink_guard().append(&format!("{line}\n"));
                }
            }
        }
    }

    fn scan(&mut self, chunk: &str) {
        let mut queued = false;
        for event in self.scanner.push(chunk) {
            match event {
                EnvelopeEvent::Text(text) => self.sink_guard().append(&text),
                EnvelopeEvent::Envelope(envelope) => queued |= self.apply_envelope(envelope),
            }
        }
        // Kick after the whole chunk lands so verification display never
        // interleaves with this chunk's own text.
        if queued {
            self.worker.kick();
        }
    }

    /// A non-empty envelope question becomes an auto-numbered, question-only
    /// fact. Returns true when a verification was queued.
    fn apply_envelope(&mut self, envelope: Envelope) -> bool {
        if let Some(confidence) = envelope.confidence {
            debug!("confidence envelope: {confidence:.2}");
        }
        let Some(question) = envelope.question() else {
            debug!("empty confidence envelope, nothing to verify");
            return false;
        };
        let number = self.parser.take_next_number();
        self.store_guard().insert_question(number, question);
        info!("envelope question {number} queued for verification");
        true
    }

    fn store_guard(&self) -> MutexGuard<'_, FactStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sink_guard(&self) -> MutexGuard<'_, dyn ResponseSink + 'static> {
        self.sink.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::CollectorSink;
    use crate::verify::MockTransport;
    use std::time::Duration;

    fn test_config(protocol: Protocol) -> Config {
        let mut config = Config {
            protocol,
            ..Config::default()
        };
        config.verify.pacing_ms = 0;
        config.verify.failure_pacing_ms = 0;
        config
    }

    fn sinks() -> (Arc<Mutex<CollectorSink>>, SharedSink) {
        let collector = Arc::new(Mutex::new(CollectorSink::new()));
        let sink: SharedSink = collector.clone();
        (collector, sink)
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition never met"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn plain_lines_render_and_fact_lines_do_not() {
        let (collector, sink) = sinks();
        let transport = Arc::new(MockTransport::new());
        let mut session = Session::new(&test_config(Protocol::NumberedLines), transport, sink);

        session.process_chunk("Hello there.\nQ1: What is the speed of light?\n");
        session.process_chunk("A1: About 300,000 km per second.\nMore chat.\n");

        assert_eq!(
            collector.lock().unwrap().open_text(),
            Some("Hello there.\nMore chat.\n")
        );
        let store = session.store();
        let store = store.lock().unwrap();
        let fact = store.get(1).unwrap();
        assert_eq!(fact.question.as_deref(), Some("What is the speed of light?"));
        assert_eq!(fact.answer.as_deref(), Some("About 300,000 km per second."));
        assert!(!store.is_completed(1));
    }

    #[tokio::test]
    async fn turn_complete_flushes_the_tail_and_verifies() {
        let (collector, sink) = sinks();
        let transport = Arc::new(MockTransport::new().with_stream(&["CORRECT"]));
        let mut session = Session::new(&test_config(Protocol::NumberedLines), transport, sink);

        session.process_chunk("Q2: Is the sky blue");
        assert!(session.store().lock().unwrap().get(2).is_none());

        session.turn_complete();
        let store = session.store();
        wait_for(|| store.lock().unwrap().is_completed(2)).await;

        let store = store.lock().unwrap();
        assert_eq!(store.get(2).unwrap().question.as_deref(), Some("Is the sky blue"));
        assert_eq!(store.get(2).unwrap().verified.as_deref(), Some("CORRECT"));
        assert!(collector.lock().unwrap().responses().is_empty());
    }

    #[tokio::test]
    async fn process_line_bypasses_the_buffer() {
        let (_collector, sink) = sinks();
        let transport = Arc::new(MockTransport::new());
        let mut session = Session::new(&test_config(Protocol::NumberedLines), transport, sink);

        session.process_line("Q7: Who painted the ceiling?");

        let store = session.store();
        let store = store.lock().unwrap();
        assert_eq!(
            store.get(7).unwrap().question.as_deref(),
            Some("Who painted the ceiling?")
        );
        assert_eq!(store.queued(), vec![7]);
    }

    #[tokio::test]
    async fn envelope_question_is_auto_numbered_and_verified() {
        let (collector, sink) = sinks();
        let transport = MockTransport::new().with_stream(&["Frank Herbert wrote Dune in 1965."]);
        let shared = Arc::new(transport.clone());
        let mut session = Session::new(&test_config(Protocol::ConfidenceEnvelope), shared, sink);

        session.process_chunk("Thinking aloud \u{a7}{\"q\": \"Who wrote Dune?\"} and more");

        let store = session.store();
        wait_for(|| store.lock().unwrap().is_completed(1)).await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].question, "Who wrote Dune?");
        assert_eq!(requests[0].answer, None);
        // The surrounding text closes when the verification display begins.
        let collector = collector.lock().unwrap();
        assert_eq!(
            collector.responses(),
            [
                "Thinking aloud  and more",
                "Frank Herbert wrote Dune in 1965."
            ]
        );
        assert_eq!(collector.open_text(), None);
    }

    #[tokio::test]
    async fn empty_envelope_triggers_nothing() {
        let (_collector, sink) = sinks();
        let transport = MockTransport::new();
        let shared = Arc::new(transport.clone());
        let mut session = Session::new(&test_config(Protocol::ConfidenceEnvelope), shared, sink);

        session.process_chunk("\u{a7}{}");
        session.turn_complete();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(transport.requests().is_empty());
        assert!(session.store().lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_discards_partial_state() {
        let (_collector, sink) = sinks();
        let transport = Arc::new(MockTransport::new());
        let mut session = Session::new(&test_config(Protocol::NumberedLines), transport, sink);

        session.process_chunk("Q1: Full question\nQ2: Partial tail");
        session.reset();
        session.turn_complete();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(session.store().lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn close_clears_verification_state() {
        let (_collector, sink) = sinks();
        let transport = Arc::new(MockTransport::new());
        let mut session = Session::new(&test_config(Protocol::NumberedLines), transport, sink);

        session.process_line("Q1: Something to verify");
        session.close();

        assert!(session.store().lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gate_blocks_initial_silence_and_passes_speech() {
        let (_collector, sink) = sinks();
        let transport = Arc::new(MockTransport::new());
        let mut session = Session::new(&test_config(Protocol::NumberedLines), transport, sink);

        assert!(!session.should_forward_audio(&[0.0; 64]));
        assert!(session.should_forward_audio(&[0.5; 64]));
    }
}
