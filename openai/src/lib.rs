//! OpenAI-compatible chat and embedding client for ragbot.
//!
//! [`OpenAI`] implements both [`LanguageModel`](ragbot_core::LanguageModel) and
//! [`EmbeddingModel`](ragbot_core::EmbeddingModel), so one value can drive the whole
//! retrieval pipeline. Any server speaking the `/chat/completions` and `/embeddings`
//! endpoints works: point [`Builder::base_url`] at it.
//!
//! ```no_run
//! use ragbot_core::{LanguageModel, llm::Message};
//! use ragbot_openai::OpenAI;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let model = OpenAI::from_env()?;
//! let reply = model
//!     .respond(&[
//!         Message::system("You are a concise assistant."),
//!         Message::user("What is retrieval-augmented generation?"),
//!     ])
//!     .await?;
//! println!("{reply}");
//! # Ok(()) }
//! ```

mod client;
mod embedding;
mod error;
mod request;
mod response;

pub use client::{Builder, OpenAI, RetryConfig};
pub use error::OpenAIError;

mod constant;
pub use constant::*;

pub(crate) const DEFAULT_MODEL: &str = GPT4O_MINI;
pub(crate) const DEFAULT_BASE_URL: &str = OPENAI_BASE_URL;
pub(crate) const DEFAULT_EMBEDDING_MODEL: &str = EMBEDDING_SMALL;
pub(crate) const DEFAULT_EMBEDDING_DIM: usize = 1536;
