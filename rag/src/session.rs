//! Conversation state owned by the caller.

use ragbot_core::llm::Message;

/// Opening line of the assistant in a fresh conversation.
pub const GREETING: &str = "How can I help?";

/// The chat history of one conversation.
///
/// A session is passed to [`crate::Assistant::get_response`] by the caller, so any
/// number of independent conversations can share one assistant. It only grows through
/// completed exchanges: every successful turn appends exactly one user message and one
/// assistant message, a failed turn appends nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    messages: Vec<Message>,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session opened by the assistant's [`GREETING`].
    #[must_use]
    pub fn with_greeting() -> Self {
        Self {
            messages: vec![Message::assistant(GREETING)],
        }
    }

    /// Returns the messages in conversation order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been said yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the number of completed question/answer exchanges.
    #[must_use]
    pub fn turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::User { .. }))
            .count()
    }

    pub(crate) fn record(&mut self, question: &str, answer: &str) {
        self.messages.push(Message::user(question));
        self.messages.push(Message::assistant(answer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_opens_the_conversation() {
        let session = Session::with_greeting();
        assert_eq!(session.messages(), [Message::assistant("How can I help?")]);
        assert_eq!(session.turns(), 0);
        assert!(Session::new().is_empty());
    }

    #[test]
    fn exchanges_add_two_messages() {
        let mut session = Session::with_greeting();
        session.record("What is RAG?", "Retrieval-augmented generation.");
        assert_eq!(session.len(), 3);
        assert_eq!(session.turns(), 1);
        assert_eq!(session.messages()[1], Message::user("What is RAG?"));
    }
}
