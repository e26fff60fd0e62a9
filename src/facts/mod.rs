//! Fact records and the verification queue.
//!
//! ```text
//!   FactParser tokens               VerificationDispatcher
//!        |                                  |
//!        v                                  v
//!   insert_question / update_answer    next_to_verify (pin)
//!        |                                  |
//!        +------------> FactStore <--------+
//!                 map + queue + pin + completed
//! ```

pub mod store;

pub use crate::defaults::CORRECT_SENTINEL;
pub use store::{AnswerOutcome, Fact, FactStore, SharedFactStore};
