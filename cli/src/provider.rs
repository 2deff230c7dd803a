//! Model construction for the CLI.

use anyhow::{Context, Result};
use ragbot_openai::{Builder, OpenAI};

/// Builds the chat and embedding client from `RAGBOT_*` variables.
///
/// `model` overrides `RAGBOT_CHAT_MODEL`. The embedding model is never overridden here,
/// since a persisted store only answers queries embedded by the model that built it.
pub fn connect(model: Option<&str>) -> Result<OpenAI> {
    let mut builder = Builder::from_env().context("cannot configure the model provider")?;
    if let Some(model) = model {
        builder = builder.model(model);
    }
    let client = builder.build()?;
    tracing::debug!(?client, "model provider ready");
    Ok(client)
}
