//! verifact - Real-time fact verification for voice conversations
//!
//! Watches a streamed conversation transcript for claimed facts, verifies
//! them against an independent model, and streams corrections back.

// Error handling discipline: library code propagates, never panics.
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod facts;
pub mod render;
pub mod session;
pub mod transcript;
pub mod verify;

// Pipeline facade
pub use session::Session;

// Render boundary (display side)
pub use render::{CollectorSink, ResponseSink, StdoutSink};

// Verification (checking side)
pub use verify::{
    GeminiTransport, MockTransport, SharedSink, VerificationDispatcher, VerificationTransport,
};

// Fact state
pub use facts::{AnswerOutcome, Fact, FactStore, SharedFactStore};

// Error handling
pub use error::{Result, VerifactError};

// Config
pub use config::{Config, Protocol};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.2+abc1234"` when git hash is available, `"0.1.2"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{version}+{hash}"),
        _ => version.to_string(),
    }
}
