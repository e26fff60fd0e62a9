//! Fact map and verification queue.
//!
//! All parser and dispatcher mutations funnel through [`FactStore`] so the
//! queue invariants hold no matter how `Q`/`A` lines interleave with
//! in-flight verifications:
//!
//! - a number appears in the queue at most once
//! - the pinned number is never advanced past until explicitly removed
//! - completed numbers never re-enter the queue

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use log::debug;

/// Store shared between the sync parse path and the async dispatcher.
pub type SharedFactStore = Arc<Mutex<FactStore>>;

/// One extracted fact and its verification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub question: Option<String>,
    pub answer: Option<String>,
    /// Verifier output once a verification finished; the sentinel `CORRECT`
    /// when the answer was confirmed as-is. Stays `None` for skipped and
    /// failed verifications.
    pub verified: Option<String>,
}

/// What [`FactStore::update_answer`] did with an incoming answer line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// No such fact; a placeholder was created and enqueued at the tail.
    Created,
    /// Same answer as stored; nothing changed.
    Unchanged,
    /// Answer changed; the fact jumped to the head of the queue.
    Promoted,
    /// Answer changed mid-verification; recorded without touching the queue.
    Recorded,
    /// The fact is already completed; the update was dropped.
    Ignored,
}

/// Fact records, the pending-verification queue, and the in-flight pin.
#[derive(Debug, Default)]
pub struct FactStore {
    facts: BTreeMap<u32, Fact>,
    queue: VecDeque<u32>,
    current: Option<u32>,
    completed: BTreeSet<u32>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a question line. Creates and tail-enqueues the fact when new;
    /// a repeated question for a known number is tolerated and dropped.
    /// Returns whether a fact was created.
    pub fn insert_question(&mut self, number: u32, text: &str) -> bool {
        if self.completed.contains(&number) {
            debug!("question for completed fact {number} ignored");
            return false;
        }
        if self.facts.contains_key(&number) {
            debug!("question {number} already known");
            return false;
        }
        self.facts.insert(
            number,
            Fact {
                question: Some(text.to_string()),
                answer: None,
                verified: None,
            },
        );
        self.enqueue_tail(number);
        debug!("stored Q{number}: {text}");
        true
    }

    /// Records an answer line, applying the correction rules.
    ///
    /// A changed answer clears any prior verification result and jumps the
    /// queue, unless that fact is the one being verified right now, in which
    /// case only the record changes. An answer with no matching question gets
    /// a placeholder question label.
    pub fn update_answer(&mut self, number: u32, text: &str) -> AnswerOutcome {
        if self.completed.contains(&number) {
            debug!("answer for completed fact {number} ignored");
            return AnswerOutcome::Ignored;
        }

        let outcome = match self.facts.get_mut(&number) {
            Some(fact) => {
                if fact.answer.as_deref() == Some(text) {
                    debug!("answer {number} unchanged");
                    AnswerOutcome::Unchanged
                } else {
                    fact.answer = Some(text.to_string());
                    fact.verified = None;
                    if self.current == Some(number) {
                        debug!("answer {number} corrected mid-verification");
                        AnswerOutcome::Recorded
                    } else {
                        self.queue.retain(|n| *n != number);
                        self.queue.push_front(number);
                        debug!("answer {number} corrected, promoted to queue head");
                        AnswerOutcome::Promoted
                    }
                }
            }
            None => {
                self.facts.insert(
                    number,
                    Fact {
                        question: Some(format!("Question {number}")),
                        answer: Some(text.to_string()),
                        verified: None,
                    },
                );
                self.enqueue_tail(number);
                debug!("stored A{number} before its question");
                AnswerOutcome::Created
            }
        };

        // Safety net: an answered fact that slipped out of the queue without
        // completing gets re-enqueued.
        if self.current != Some(number) {
            self.enqueue_tail(number);
        }
        outcome
    }

    /// Writes a verification result back. Late writes to a completed fact
    /// are dropped.
    pub fn set_verified(&mut self, number: u32, verified: Option<String>) {
        if self.completed.contains(&number) {
            debug!("verification result for completed fact {number} ignored");
            return;
        }
        if let Some(fact) = self.facts.get_mut(&number) {
            fact.verified = verified;
        }
    }

    /// Peeks the queue head and pins it as the in-flight verification.
    ///
    /// Idempotent while pinned: repeated calls return the same number until
    /// [`FactStore::mark_completed`] releases it. The number stays in the
    /// queue until explicitly removed.
    pub fn next_to_verify(&mut self) -> Option<u32> {
        if let Some(current) = self.current {
            return Some(current);
        }
        let head = self.queue.front().copied()?;
        self.current = Some(head);
        Some(head)
    }

    /// Removes a number from the queue wherever it sits.
    pub fn remove_from_queue(&mut self, number: u32) {
        self.queue.retain(|n| *n != number);
    }

    /// Marks a fact terminally completed and releases the pin if it held
    /// this number.
    pub fn mark_completed(&mut self, number: u32) {
        self.completed.insert(number);
        if self.current == Some(number) {
            self.current = None;
        }
    }

    pub fn is_verifying(&self) -> bool {
        self.current.is_some()
    }

    /// Number pinned as in-flight, if any.
    pub fn current(&self) -> Option<u32> {
        self.current
    }

    pub fn get(&self, number: u32) -> Option<&Fact> {
        self.facts.get(&number)
    }

    pub fn is_completed(&self, number: u32) -> bool {
        self.completed.contains(&number)
    }

    /// Snapshot of the queue, head first.
    pub fn queued(&self) -> Vec<u32> {
        self.queue.iter().copied().collect()
    }

    /// Number of facts on record.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Drops all facts, queue contents, the pin, and completion marks.
    pub fn reset(&mut self) {
        self.facts.clear();
        self.queue.clear();
        self.current = None;
        self.completed.clear();
    }

    fn enqueue_tail(&mut self, number: u32) {
        if !self.queue.contains(&number) {
            self.queue.push_back(number);
        }
    }

    #[cfg(test)]
    pub(crate) fn enqueue_unchecked(&mut self, number: u32) {
        self.enqueue_tail(number);
    }
}
