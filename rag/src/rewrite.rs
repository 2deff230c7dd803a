//! Query reformulation with a language model.

use ragbot_core::llm::{LanguageModel, Message};

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// Turns follow-up questions into standalone queries and expands them into
/// paraphrases.
///
/// Model failures never fail a turn here: each operation degrades to the input it was
/// given and logs a warning.
#[derive(Debug, Clone)]
pub struct QueryRewriter<L> {
    model: L,
    variants: usize,
}

impl<L: LanguageModel> QueryRewriter<L> {
    /// Creates a rewriter asking for 3 paraphrases per query.
    #[must_use]
    pub const fn new(model: L) -> Self {
        Self { model, variants: 3 }
    }

    /// Creates a rewriter using the variant count of `config`.
    #[must_use]
    pub const fn from_config(model: L, config: &RagConfig) -> Self {
        Self {
            model,
            variants: config.query_variants,
        }
    }

    /// Sets how many paraphrases [`QueryRewriter::variants`] asks for.
    #[must_use]
    pub const fn with_variants(mut self, count: usize) -> Self {
        self.variants = count;
        self
    }

    /// Returns the language model.
    pub const fn model(&self) -> &L {
        &self.model
    }

    /// Rewrites `question` so it can be understood without `history`.
    ///
    /// With an empty history (system messages and the greeting aside, nothing said by
    /// the user yet) the question is returned as is and the model is not called. If
    /// the model fails or replies with blank text, the trimmed question is used.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] if `question` is blank.
    pub async fn standalone_query(&self, history: &[Message], question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidArgument("question must not be empty".into()));
        }
        if !history.iter().any(|m| matches!(m, Message::User { .. })) {
            return Ok(question.to_string());
        }

        match self.model.rewrite(history, question).await {
            Ok(rewritten) => {
                let rewritten = rewritten.trim();
                if rewritten.is_empty() {
                    tracing::warn!("query rewrite returned blank text, using the original question");
                    Ok(question.to_string())
                } else {
                    tracing::debug!(original = question, rewritten, "rewrote follow-up question");
                    Ok(rewritten.to_string())
                }
            }
            Err(error) => {
                tracing::warn!(%error, "query rewrite failed, using the original question");
                Ok(question.to_string())
            }
        }
    }

    /// Asks the model for paraphrases of `query`.
    ///
    /// Lines are stripped of numbering and bullets; blank lines and duplicates are
    /// dropped and at most the configured number is kept. A failed or empty reply
    /// yields `[query]`.
    pub async fn variants(&self, query: &str) -> Vec<String> {
        if self.variants == 0 {
            return vec![query.to_string()];
        }

        let variants = match self.model.paraphrase(query, self.variants).await {
            Ok(reply) => parse_variants(&reply, self.variants),
            Err(error) => {
                tracing::warn!(%error, "query expansion failed, using the query alone");
                Vec::new()
            }
        };

        if variants.is_empty() {
            vec![query.to_string()]
        } else {
            tracing::debug!(count = variants.len(), "expanded query");
            variants
        }
    }
}

/// Splits a paraphrase reply into cleaned, distinct lines.
#[must_use]
pub fn parse_variants(reply: &str, limit: usize) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    for line in reply.lines() {
        let cleaned = strip_marker(line.trim());
        if cleaned.is_empty() || variants.iter().any(|v| v == cleaned) {
            continue;
        }
        variants.push(cleaned.to_string());
        if variants.len() == limit {
            break;
        }
    }
    variants
}

/// Removes one leading list marker such as `1.`, `2)`, `-`, `*` or `•`. A marker only
/// counts when whitespace follows it, so `1.5 million` and `**Bold**` are left alone.
fn strip_marker(line: &str) -> &str {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = if digits > 0 {
        line[digits..].strip_prefix(['.', ')'])
    } else {
        line.strip_prefix(['-', '*', '•'])
    };
    match rest {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => line,
    }
}
