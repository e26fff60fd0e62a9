//! Streaming fact verification.
//!
//! ```text
//!  fact queue --> dispatcher --> prompt --> Gemini streamGenerateContent
//!                     ^                              |
//!                     |                              v  SSE chunks
//!                 classifier  <------------------ sse parser
//!                     |
//!                     v
//!              store + renderer
//! ```
//!
//! The dispatcher drains the fact queue one fact at a time. Each
//! verification streams token deltas over SSE; the classifier watches the
//! head of the stream for the SKIP and CORRECT sentinels before any text
//! reaches the renderer, then the result lands back in the store.

pub mod classifier;
pub mod client;
pub mod dispatcher;
pub mod prompt;
pub mod sse;

pub use classifier::{DisplayAction, StreamClassifier, Verdict};
pub use client::{GeminiTransport, MockTransport, StreamEvent, VerificationTransport};
pub use dispatcher::{DispatcherHandle, SharedSink, VerificationDispatcher};
pub use prompt::VerificationRequest;
pub use sse::{SseDelta, SseParser};
