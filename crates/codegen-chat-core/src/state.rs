//! UI-agnostic conversation state
//!
//! This module contains the message list, the prompt being composed and the
//! busy flag. It does no I/O: the [`Controller`](crate::controller::Controller)
//! drives the outbound request and feeds the outcome back in through
//! [`Conversation::settle`].

use serde::{Deserialize, Serialize};

use crate::ai::GenerateError;

/// Prefix for assistant messages produced from a failed request
pub const FAILURE_PREFIX: &str = "Sorry, something went wrong";

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Set only on successful assistant responses carrying generated source
    pub is_code: bool,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            is_code: false,
        }
    }

    pub fn code(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            is_code: true,
        }
    }

    pub fn failure(err: &GenerateError) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: format!("{}: {}", FAILURE_PREFIX, err),
            is_code: false,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.role == ChatRole::Assistant && !self.is_code
    }
}

/// Session-local conversation state.
///
/// Messages are append-only; callers only ever see them as a slice.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    pub pending_input: String,
    busy: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Whether `submit` would currently be accepted
    pub fn can_submit(&self) -> bool {
        !self.busy && !self.pending_input.trim().is_empty()
    }

    /// Commit the pending input as a user message and mark the conversation busy.
    ///
    /// Returns the trimmed prompt to send, or `None` when the input is blank or
    /// a request is already outstanding. A rejected call changes nothing.
    pub fn begin_submit(&mut self) -> Option<String> {
        if !self.can_submit() {
            return None;
        }

        let text = self.pending_input.trim().to_string();
        self.messages.push(ChatMessage::user(text.clone()));
        self.pending_input.clear();
        self.busy = true;
        Some(text)
    }

    /// Record the outcome of the outstanding request and return to idle.
    ///
    /// Ignored when nothing is outstanding, so a stray outcome can never
    /// append a second reply.
    pub fn settle(&mut self, outcome: Result<String, GenerateError>) -> bool {
        if !self.busy {
            return false;
        }

        let message = match outcome {
            Ok(code) => ChatMessage::code(code),
            Err(err) => ChatMessage::failure(&err),
        };
        self.messages.push(message);
        self.busy = false;
        true
    }

    /// Indices of code messages, oldest first
    pub fn code_message_indices(&self) -> Vec<usize> {
        self.messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_code)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_input(text: &str) -> Conversation {
        let mut conv = Conversation::new();
        conv.pending_input = text.to_string();
        conv
    }

    #[test]
    fn test_begin_submit_appends_trimmed_user_message() {
        let mut conv = with_input("  write a fizzbuzz  ");
        let prompt = conv.begin_submit();

        assert_eq!(prompt.as_deref(), Some("write a fizzbuzz"));
        assert_eq!(conv.messages(), &[ChatMessage::user("write a fizzbuzz")]);
        assert!(conv.pending_input.is_empty());
        assert!(conv.is_busy());
    }

    #[test]
    fn test_begin_submit_rejects_blank_input() {
        for input in ["", "   ", "\n\t "] {
            let mut conv = with_input(input);
            assert_eq!(conv.begin_submit(), None);
            assert!(conv.messages().is_empty());
            assert_eq!(conv.pending_input, input);
            assert!(!conv.is_busy());
        }
    }

    #[test]
    fn test_begin_submit_rejects_while_busy() {
        let mut conv = with_input("first");
        conv.begin_submit();
        conv.pending_input = "second".to_string();

        assert_eq!(conv.begin_submit(), None);
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.pending_input, "second");
    }

    #[test]
    fn test_settle_success_appends_code() {
        let mut conv = with_input("a constant");
        conv.begin_submit();

        assert!(conv.settle(Ok("const x = 1;".to_string())));
        assert!(!conv.is_busy());
        let last = conv.messages().last().unwrap();
        assert_eq!(last, &ChatMessage::code("const x = 1;"));
        assert!(last.is_code);
    }

    #[test]
    fn test_settle_failure_appends_diagnostic() {
        let mut conv = with_input("a constant");
        conv.begin_submit();

        conv.settle(Err(GenerateError::Service("bad request".to_string())));
        assert!(!conv.is_busy());
        assert_eq!(conv.messages().len(), 2);
        let last = &conv.messages()[1];
        assert_eq!(last.role, ChatRole::Assistant);
        assert!(!last.is_code);
        assert!(last.is_failure());
        assert!(last.content.starts_with(FAILURE_PREFIX));
        assert!(last.content.contains("bad request"));
    }

    #[test]
    fn test_settle_when_idle_is_ignored() {
        let mut conv = Conversation::new();
        assert!(!conv.settle(Ok("orphan".to_string())));
        assert!(conv.messages().is_empty());
    }

    #[test]
    fn test_code_message_indices() {
        let mut conv = with_input("one");
        conv.begin_submit();
        conv.settle(Ok("1".to_string()));
        conv.pending_input = "two".to_string();
        conv.begin_submit();
        conv.settle(Err(GenerateError::NotConfigured));
        conv.pending_input = "three".to_string();
        conv.begin_submit();
        conv.settle(Ok("3".to_string()));

        assert_eq!(conv.code_message_indices(), vec![1, 5]);
    }
}
