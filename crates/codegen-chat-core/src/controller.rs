//! Conversation controller
//!
//! Owns the [`Conversation`] and at most one in-flight request. `submit` does
//! the synchronous half of an exchange (append the prompt, go busy, spawn the
//! request); `poll` or `wait` does the other half once the request settles.

use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};

use crate::ai::{CodeGenerator, GenerateError};
use crate::state::{ChatMessage, Conversation};

type Outcome = Result<String, GenerateError>;

pub struct Controller {
    conversation: Conversation,
    generator: Arc<dyn CodeGenerator>,
    in_flight: Option<JoinHandle<Outcome>>,
}

impl Controller {
    pub fn new(generator: Arc<dyn CodeGenerator>) -> Self {
        Self {
            conversation: Conversation::new(),
            generator,
            in_flight: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    pub fn is_busy(&self) -> bool {
        self.conversation.is_busy()
    }

    pub fn pending_input(&self) -> &str {
        &self.conversation.pending_input
    }

    pub fn pending_input_mut(&mut self) -> &mut String {
        &mut self.conversation.pending_input
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Swap the code generator. Refused while a request is outstanding.
    pub fn set_generator(&mut self, generator: Arc<dyn CodeGenerator>) -> bool {
        if self.is_busy() {
            return false;
        }
        tracing::info!(generator = generator.name(), "code generator changed");
        self.generator = generator;
        true
    }

    /// Submit the pending input.
    ///
    /// Returns `false` (and changes nothing) if the input is blank or a request
    /// is already outstanding. Must be called from within a tokio runtime.
    pub fn submit(&mut self) -> bool {
        let Some(prompt) = self.conversation.begin_submit() else {
            tracing::debug!(busy = self.is_busy(), "submit ignored");
            return false;
        };

        tracing::info!(
            generator = self.generator.name(),
            prompt_len = prompt.len(),
            "prompt submitted"
        );

        let generator = Arc::clone(&self.generator);
        self.in_flight = Some(tokio::spawn(async move {
            generator.generate(&prompt).await
        }));
        true
    }

    /// Settle the outstanding request if it has finished. Never blocks.
    pub async fn poll(&mut self) -> bool {
        match &self.in_flight {
            Some(handle) if handle.is_finished() => {}
            _ => return false,
        }
        self.wait().await
    }

    /// Wait for the outstanding request, if any, and settle it.
    pub async fn wait(&mut self) -> bool {
        let Some(handle) = self.in_flight.take() else {
            return false;
        };
        let joined = handle.await;
        self.finish(joined)
    }

    fn finish(&mut self, joined: Result<Outcome, JoinError>) -> bool {
        let outcome = joined.unwrap_or_else(|e| Err(GenerateError::Aborted(e.to_string())));
        match &outcome {
            Ok(code) => tracing::info!(code_len = code.len(), "generation succeeded"),
            Err(err) => tracing::warn!(error = %err, "generation failed"),
        }
        self.conversation.settle(outcome)
    }
}
