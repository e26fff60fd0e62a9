//! Verification request and prompt construction.

/// One verification job handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub number: u32,
    pub question: String,
    /// Answer claimed in conversation, if one was ever given.
    pub answer: Option<String>,
}

impl VerificationRequest {
    /// Renders the user-turn prompt. With an answer on record the verifier
    /// is asked to check the claim; without one it is asked to find the
    /// answer itself.
    pub fn prompt(&self) -> String {
        match &self.answer {
            Some(answer) => format!(
                "Question: {}\nUser's Answer: {}\n\nPlease verify if this answer is correct.",
                self.question, answer
            ),
            None => format!(
                "Question: {}\n\nPlease find and verify the correct answer to this question.",
                self.question
            ),
        }
    }
}
