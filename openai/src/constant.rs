//! Model, endpoint and environment constants
//!
//! These constants only cover **stable, non-snapshot** model names plus well-known
//! OpenAI-compatible API base URLs. Any other model name can be passed as a string.

/// Default `OpenAI` API base URL (chat, embeddings, etc.).
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// [`Deepseek`](https://api-docs.deepseek.com)'s OpenAI-compatible base URL.
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
/// [`OpenRouter`](https://openrouter.ai)'s OpenAI-compatible base URL.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Small, fast and cheap chat model.
pub const GPT4O_MINI: &str = "gpt-4o-mini";
/// Flagship multimodal chat model.
pub const GPT4O: &str = "gpt-4o";

/// Default embedding model with 1536 dimensions.
pub const EMBEDDING_SMALL: &str = "text-embedding-3-small";
/// Larger embedding model with 3072 dimensions.
pub const EMBEDDING_LARGE: &str = "text-embedding-3-large";
/// Legacy embedding model with 1536 dimensions.
pub const EMBEDDING_ADA_002: &str = "text-embedding-ada-002";

/// Environment variable holding the API key (required).
pub const API_KEY_VAR: &str = "RAGBOT_API_KEY";
/// Environment variable overriding the API base URL.
pub const BASE_URL_VAR: &str = "RAGBOT_BASE_URL";
/// Environment variable selecting the chat model.
pub const CHAT_MODEL_VAR: &str = "RAGBOT_CHAT_MODEL";
/// Environment variable selecting the embedding model.
pub const EMBEDDING_MODEL_VAR: &str = "RAGBOT_EMBEDDING_MODEL";
/// Environment variable declaring the embedding dimension of a custom model.
pub const EMBEDDING_DIM_VAR: &str = "RAGBOT_EMBEDDING_DIM";
