//! The question-answering turn: rewrite, retrieve, compose, cite.

use std::fmt;
use std::sync::Arc;

use ragbot_core::LanguageModel;

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::multi_query::MultiQueryRetriever;
use crate::retriever::Retriever;
use crate::rewrite::QueryRewriter;
use crate::session::Session;
use crate::types::SearchResult;

/// Separator placed between retrieved chunks in the answer context.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// An answer with the documents it was grounded on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// The model's reply.
    pub text: String,
    /// Distinct `source` values of the retrieved chunks, in retrieval order.
    pub sources: Vec<String>,
}

impl Answer {
    /// Returns the reply followed by a `Sources:` line when anything was cited.
    #[must_use]
    pub fn render(&self) -> String {
        if self.sources.is_empty() {
            self.text.clone()
        } else {
            format!("{}\n\nSources: {}", self.text, self.sources.join(", "))
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Answers questions from a retriever's corpus, one session turn at a time.
///
/// A turn runs four steps:
///
/// 1. the question is made standalone using the session history
/// 2. it is expanded into paraphrases, each searched with `top_k` through `retriever`
/// 3. the model composes a reply from the retrieved chunks, the history and the
///    original question
/// 4. the session records the question and the rendered answer
pub struct Assistant<L, R> {
    model: Arc<L>,
    rewriter: QueryRewriter<Arc<L>>,
    retriever: MultiQueryRetriever<Arc<L>, R>,
    top_k: usize,
}

impl<L, R> fmt::Debug for Assistant<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assistant")
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl<L: LanguageModel, R: Retriever> Assistant<L, R> {
    /// Creates an assistant over `retriever` with the settings of `config`.
    #[must_use]
    pub fn new(model: Arc<L>, retriever: R, config: &RagConfig) -> Self {
        Self {
            rewriter: QueryRewriter::from_config(Arc::clone(&model), config),
            retriever: MultiQueryRetriever::from_config(Arc::clone(&model), retriever, config),
            top_k: config.top_k,
            model,
        }
    }

    /// Returns the retriever used for each turn.
    pub const fn retriever(&self) -> &MultiQueryRetriever<Arc<L>, R> {
        &self.retriever
    }

    /// Answers `question` in the context of `session` and records the exchange.
    ///
    /// On error the session is left untouched.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] for a blank question,
    /// [`RagError::ExternalServiceUnavailable`] if retrieval or the answer model fails,
    /// and any other retrieval error unchanged.
    pub async fn get_response(&self, session: &mut Session, question: &str) -> Result<Answer> {
        let history = session.messages();
        let query = self.rewriter.standalone_query(history, question).await?;
        let results = self.retriever.query(&query, self.top_k).await?;
        tracing::info!(query = %query, chunks = results.len(), "retrieved context");

        let question = question.trim();
        let context = format_context(&results);
        let reply = self
            .model
            .compose(history, &context, question)
            .await
            .map_err(|e| RagError::ExternalServiceUnavailable(format!("answer model: {e}")))?;

        let answer = Answer {
            text: reply.trim().to_string(),
            sources: distinct_sources(&results),
        };
        session.record(question, &answer.render());
        Ok(answer)
    }
}

fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

fn distinct_sources(results: &[SearchResult]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for result in results {
        let source = result.chunk.source();
        if !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
    }
    sources
}
