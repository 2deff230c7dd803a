#![no_std]
//! # ragbot
//!
//! High level façade crate that re-exports everything from [`ragbot_core`] plus the optional
//! retrieval, PDF and provider crates. Pull this crate into your binary to build a
//! question-answering assistant over your own PDF collection.
//!
//! ## What's inside?
//!
//! - [`LanguageModel`](ragbot_core::LanguageModel) and [`EmbeddingModel`](ragbot_core::EmbeddingModel),
//!   the two collaborators every pipeline is built from.
//! - `rag` (default): chunking, vector + keyword indices, hybrid fusion, query rewriting,
//!   sessions and the [`Assistant`](ragbot_rag::Assistant) entry point.
//! - `pdf-process`: lopdf based text extraction.
//! - `openai`: an HTTP client for OpenAI-compatible chat and embedding endpoints.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ragbot::rag::{Assistant, IndexBuilder, RagConfig, Session, SharedCorpus};
//! use ragbot::openai::OpenAI;
//! use std::sync::Arc;
//!
//! async fn demo(model: OpenAI, documents: Vec<ragbot::rag::Document>) -> anyhow::Result<()> {
//!     let config = RagConfig::default();
//!     let model = Arc::new(model);
//!     let corpus = IndexBuilder::new(Arc::clone(&model), config.clone())
//!         .build(documents, |_| {})
//!         .await?;
//!
//!     let shared = SharedCorpus::new(config.clone());
//!     shared.publish(corpus);
//!
//!     let assistant = Assistant::new(model, shared, &config);
//!     let mut session = Session::with_greeting();
//!     let answer = assistant.get_response(&mut session, "What is RAG?").await?;
//!     println!("{}", answer.render());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`ragbot_core::llm`]: messages, prompts and the language model trait.
//! - [`ragbot_core::embedding`]: convert text to vectors.

pub use ragbot_core::*;

#[cfg(feature = "rag")]
pub use ragbot_rag as rag;

#[cfg(feature = "pdf-process")]
pub use ragbot_pdf as pdf;

#[cfg(feature = "openai")]
pub use ragbot_openai as openai;
