//! Verification queue dispatcher.
//!
//! Drains the fact queue one verification at a time:
//!
//! ```text
//! Idle -> Dispatching -> StreamingAnswer -> Idle
//!             |
//!             +-> Skipped -> Idle      (sentinel SKIP, silent drop)
//!             +-> Correct -> Idle      (sentinel CORRECT, silent confirm)
//! ```
//!
//! The store pin admits exactly one drain loop at a time; the parser may
//! keep mutating facts and the queue while a verification streams. A failed
//! verification renders an inline error and still advances, so the queue
//! never stalls behind one bad fact.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::VerifyConfig;
use crate::defaults;
use crate::error::VerifactError;
use crate::facts::{FactStore, SharedFactStore};
use crate::render::ResponseSink;
use crate::verify::classifier::{DisplayAction, StreamClassifier, Verdict};
use crate::verify::client::{StreamEvent, VerificationTransport};
use crate::verify::prompt::VerificationRequest;

/// Renderer handle shared with the session.
pub type SharedSink = Arc<Mutex<dyn ResponseSink>>;

enum Claim {
    /// Head fact had no question to verify; it was discarded.
    Dropped,
    Verify(VerificationRequest),
}

/// Streams verifications for queued facts, one at a time.
pub struct VerificationDispatcher {
    store: SharedFactStore,
    transport: Arc<dyn VerificationTransport>,
    sink: SharedSink,
    pacing: Duration,
    failure_pacing: Duration,
}

impl VerificationDispatcher {
    pub fn new(
        store: SharedFactStore,
        transport: Arc<dyn VerificationTransport>,
        sink: SharedSink,
        config: &VerifyConfig,
    ) -> Self {
        Self {
            store,
            transport,
            sink,
            pacing: Duration::from_millis(config.pacing_ms),
            failure_pacing: Duration::from_millis(config.failure_pacing_ms),
        }
    }

    /// Moves the dispatcher onto a background worker that drains the queue
    /// on every kick. Requires a running runtime.
    pub fn spawn(self) -> DispatcherHandle {
        let (kick, mut wakeups) = mpsc::channel(1);
        let task = tokio::spawn(async move {
            while wakeups.recv().await.is_some() {
                self.run_queue().await;
            }
        });
        DispatcherHandle { kick, task }
    }

    /// Verifies queued facts until the queue is empty. Returns immediately
    /// if another drain loop already holds the pin.
    pub async fn run_queue(&self) {
        loop {
            match self.claim_next() {
                None => return,
                Some(Claim::Dropped) => continue,
                Some(Claim::Verify(request)) => {
                    let failed = self.verify(request).await;
                    self.pace(failed).await;
                }
            }
        }
    }

    /// Pins the queue head and copies out what the transport needs. Holds
    /// the store lock for the whole check so concurrent loops cannot claim
    /// the same fact.
    fn claim_next(&self) -> Option<Claim> {
        let mut store = self.store_guard();
        if store.is_verifying() {
            debug!("verification already in flight, not claiming");
            return None;
        }
        let number = store.next_to_verify()?;
        let fact = store.get(number).cloned();
        let question = fact.as_ref().and_then(|f| f.question.clone());
        let Some(question) = question else {
            info!("fact {number} incomplete (missing question), dropping");
            store.remove_from_queue(number);
            store.mark_completed(number);
            return Some(Claim::Dropped);
        };
        let answer = fact.and_then(|f| f.answer);
        Some(Claim::Verify(VerificationRequest {
            number,
            question,
            answer,
        }))
    }

    async fn verify(&self, request: VerificationRequest) -> bool {
        let number = request.number;
        let mut events = match self.transport.open(request).await {
            Ok(events) => events,
            Err(err) => {
                self.fail(number, &err);
                return true;
            }
        };

        let mut classifier = StreamClassifier::new();
        let mut display_started = false;
        let mut grounded = false;

        while let Some(event) = events.recv().await {
            match event {
                StreamEvent::Delta {
                    text,
                    grounded: delta_grounded,
                } => {
                    grounded |= delta_grounded;
                    match classifier.push(&text) {
                        DisplayAction::Hold => {}
                        DisplayAction::Begin(buffered) => {
                            display_started = true;
                            let mut sink = self.sink_guard();
                            sink.begin();
                            sink.append(&buffered);
                        }
                        DisplayAction::Stream(delta) => {
                            self.sink_guard().append(&delta);
                        }
                    }
                }
                StreamEvent::Failed(message) => {
                    self.fail(number, &VerifactError::VerificationStream { message });
                    return true;
                }
            }
        }

        if grounded {
            debug!("fact {number} verification was search-grounded");
        }

        match classifier.finish() {
            Verdict::Skipped => {
                info!("fact {number} skipped (unverifiable question)");
                self.complete(number);
                self.sink_guard().fact_verified(number, None);
            }
            Verdict::Correct => {
                info!("fact {number} confirmed correct");
                self.store_guard()
                    .set_verified(number, Some(defaults::CORRECT_SENTINEL.to_string()));
                self.sink_guard().discard();
                self.complete(number);
                self.sink_guard().fact_verified(number, None);
            }
            Verdict::Answer(text) => {
                if !display_started && !text.trim().is_empty() {
                    // Stream ended before classification resolved; flush.
                    let mut sink = self.sink_guard();
                    sink.begin();
                    sink.append(&text);
                    display_started = true;
                }
                info!("fact {number} verified");
                self.store_guard().set_verified(number, Some(text.clone()));
                self.sink_guard().finalize();
                self.complete(number);
                let display = display_started.then_some(text.as_str());
                self.sink_guard().fact_verified(number, display);
            }
        }
        false
    }

    /// Renders an inline failure and advances past the fact. The stored
    /// verification result stays empty.
    fn fail(&self, number: u32, err: &VerifactError) {
        warn!("verification of fact {number} failed: {err}");
        let text = format!("[Verification failed: {err}]");
        {
            let mut sink = self.sink_guard();
            sink.begin();
            sink.append(&text);
            sink.finalize();
        }
        self.complete(number);
        self.sink_guard().fact_verified(number, Some(&text));
    }

    fn complete(&self, number: u32) {
        let mut store = self.store_guard();
        store.remove_from_queue(number);
        store.mark_completed(number);
    }

    async fn pace(&self, failed: bool) {
        let delay = if failed {
            self.failure_pacing
        } else {
            self.pacing
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn store_guard(&self) -> MutexGuard<'_, FactStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sink_guard(&self) -> MutexGuard<'_, dyn ResponseSink + 'static> {
        self.sink.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle to the background drain worker.
pub struct DispatcherHandle {
    kick: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Nudges the worker to drain the queue. Kicks coalesce while one is
    /// already pending.
    pub fn kick(&self) {
        let _ = self.kick.try_send(());
    }

    /// Abandons the worker, including any in-flight verification stream.
    pub fn stop(&self) {
        self.task.abort();
    }
}
