//! # ragbot-core
//!
//! `ragbot-core` hosts the no-std trait APIs the rest of the workspace is built on. The retrieval
//! pipeline never talks to a provider directly: it is handed an [`EmbeddingModel`] to turn text
//! into vectors and a [`LanguageModel`] to rewrite questions and compose answers.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   ragbot-rag    │───▶│   ragbot-core    │◀───│   Providers     │
//! │                 │    │   (this crate)   │    │                 │
//! │ - Chunking      │    │                  │    │ - openai        │
//! │ - Hybrid search │    │ - LanguageModel  │    │ - test doubles  │
//! │ - Sessions      │    │ - EmbeddingModel │    │                 │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! ## Capabilities
//!
//! | Capability | Trait | Description |
//! |------------|-------|-------------|
//! | **Language Models** | [`LanguageModel`] | Chat completion plus query rewriting and answer composition helpers |
//! | **Embeddings** | [`EmbeddingModel`] | Convert text to vectors for semantic search |
//!
//! ## Example
//!
//! ```rust
//! use ragbot_core::{LanguageModel, llm::Message};
//!
//! async fn ask(model: impl LanguageModel) -> ragbot_core::Result {
//!     let history = [Message::assistant("How can I help?")];
//!     let standalone = model
//!         .rewrite(&history, "and what about its licence?")
//!         .await?;
//!     Ok(standalone)
//! }
//! ```
//!
//! ## Modules
//!
//! - [`embedding`]: turn text into dense vectors.
//! - [`llm`]: messages, prompts and the language model trait.

#![no_std]
extern crate alloc;

/// Text embeddings.
pub mod embedding;
pub mod llm;

use alloc::string::String;

#[doc(inline)]
pub use embedding::EmbeddingModel;
#[doc(inline)]
pub use llm::LanguageModel;

/// Result type used throughout the crate.
///
/// Type alias for [`anyhow::Result<T>`](anyhow::Result) with [`String`] as default success type.
pub type Result<T = String> = anyhow::Result<T>;

pub use anyhow::Error;
