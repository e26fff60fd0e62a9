//! Transcript intake: line assembly and protocol parsing.
//!
//! ```text
//! streamed text chunks
//!         |
//!         v
//!   TranscriptBuffer ---> completed lines ---> FactParser ---> LineToken
//!         |                                                  (Q/A/Plain)
//!         +--> flush() at turn end
//!
//!   EnvelopeScanner (alternate protocol): text + §{...} envelopes
//! ```

pub mod buffer;
pub mod envelope;
pub mod parser;

pub use buffer::TranscriptBuffer;
pub use envelope::{Envelope, EnvelopeEvent, EnvelopeScanner};
pub use parser::{FactParser, LineToken};
