//! # Language Models and Conversation Management
//!
//! This module provides everything the retrieval pipeline needs from a chat model, in a
//! provider-agnostic way.
//!
//! ## Core Components
//!
//! - **[`LanguageModel`]** - The trait providers implement
//! - **[`Message`]** - Represents individual messages in a conversation
//! - **[`oneshot`]** - Builds a single system + user exchange
//!
//! Providers only implement [`LanguageModel::respond`]. The three pipeline operations,
//! [`rewrite`](LanguageModel::rewrite), [`paraphrase`](LanguageModel::paraphrase) and
//! [`compose`](LanguageModel::compose), have default implementations that wrap `respond` with
//! the right instructions.
//!
//! ## Quick Start
//!
//! ```rust
//! use ragbot_core::llm::{LanguageModel, Message, oneshot};
//!
//! async fn capital(model: impl LanguageModel) -> ragbot_core::Result {
//!     model
//!         .respond(&oneshot("You are a helpful assistant", "What's the capital of Japan?"))
//!         .await
//! }
//! ```
//!
//! ### Multi-turn Conversation
//!
//! ```rust
//! use ragbot_core::llm::Message;
//!
//! let messages = [
//!     Message::system("You are a helpful assistant"),
//!     Message::assistant("How can I help?"),
//!     Message::user("What does the 2023 report say about funding?"),
//! ];
//! ```

/// Message types and conversation handling.
pub mod message;

mod prompts;

use alloc::{boxed::Box, string::String, sync::Arc, vec, vec::Vec};
use core::future::Future;
pub use message::{Message, Role};

/// Language models for text generation and conversation.
///
/// See the [module documentation](crate::llm) for examples and usage patterns.
pub trait LanguageModel: Sized + Send + Sync {
    /// Generates the assistant reply to a conversation.
    fn respond(&self, messages: &[Message]) -> impl Future<Output = crate::Result> + Send;

    /// Turns a follow-up question into a standalone one using the chat history.
    ///
    /// The model is instructed to rephrase only, never to answer.
    fn rewrite(
        &self,
        history: &[Message],
        question: &str,
    ) -> impl Future<Output = crate::Result> + Send {
        let messages = with_history(String::from(prompts::contextualize()), history, question);
        async move { self.respond(&messages).await }
    }

    /// Produces `count` alternative phrasings of a query, one per line.
    ///
    /// # Note for Implementors
    /// The raw reply is returned; callers split and clean the lines themselves.
    fn paraphrase(&self, query: &str, count: usize) -> impl Future<Output = crate::Result> + Send {
        let messages = oneshot(prompts::multi_query(count), query);
        async move { self.respond(&messages).await }
    }

    /// Composes the final answer from retrieved context.
    fn compose(
        &self,
        history: &[Message],
        context: &str,
        question: &str,
    ) -> impl Future<Output = crate::Result> + Send {
        let messages = with_history(prompts::answer(context), history, question);
        async move { self.respond(&messages).await }
    }
}

macro_rules! impl_language_model {
    ($($name:ident),*) => {
        $(
            impl<T: LanguageModel> LanguageModel for $name<T> {
                fn respond(&self, messages: &[Message]) -> impl Future<Output = crate::Result> + Send {
                    T::respond(self, messages)
                }

                fn rewrite(
                    &self,
                    history: &[Message],
                    question: &str,
                ) -> impl Future<Output = crate::Result> + Send {
                    T::rewrite(self, history, question)
                }

                fn paraphrase(
                    &self,
                    query: &str,
                    count: usize,
                ) -> impl Future<Output = crate::Result> + Send {
                    T::paraphrase(self, query, count)
                }

                fn compose(
                    &self,
                    history: &[Message],
                    context: &str,
                    question: &str,
                ) -> impl Future<Output = crate::Result> + Send {
                    T::compose(self, history, context, question)
                }
            }
        )*
    };
}

impl<T: LanguageModel> LanguageModel for &T {
    fn respond(&self, messages: &[Message]) -> impl Future<Output = crate::Result> + Send {
        T::respond(self, messages)
    }

    fn rewrite(
        &self,
        history: &[Message],
        question: &str,
    ) -> impl Future<Output = crate::Result> + Send {
        T::rewrite(self, history, question)
    }

    fn paraphrase(&self, query: &str, count: usize) -> impl Future<Output = crate::Result> + Send {
        T::paraphrase(self, query, count)
    }

    fn compose(
        &self,
        history: &[Message],
        context: &str,
        question: &str,
    ) -> impl Future<Output = crate::Result> + Send {
        T::compose(self, history, context, question)
    }
}

impl_language_model!(Arc, Box);

/// Convenience helper that creates a single system + user exchange.
pub fn oneshot(system: impl Into<String>, user: impl Into<String>) -> Vec<Message> {
    vec![Message::system(system.into()), Message::user(user.into())]
}

// System messages already in the history are dropped; the instruction passed here replaces them.
fn with_history(system: String, history: &[Message], question: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system));
    messages.extend(
        history
            .iter()
            .filter(|message| message.role() != Role::System)
            .cloned(),
    );
    messages.push(Message::user(question));
    messages
}
