//! Collaborator contract for the generative backend, plus the summary
//! prompt builder.
//!
//! The backend produces a lazy, finite, non-restartable sequence of
//! text fragments. Dropping the stream mid-flight cancels the
//! underlying request — the pipeline relies on this when a deadline
//! expires.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::types::SearchHit;

/// A boxed stream of generated text fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A streaming generative text backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Start generating from `prompt`, returning fragments as they are
    /// produced.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Generation`](crate::SearchError::Generation)
    /// if the request cannot be started. Mid-stream failures surface as
    /// `Err` items on the stream.
    async fn generate(&self, prompt: &str) -> Result<TokenStream>;
}

/// Build the summarization prompt from the top search hits.
///
/// At most `context_size` hits are included, independent of how many
/// the search returned, keeping the prompt bounded.
pub fn build_summary_prompt(query: &str, hits: &[SearchHit], context_size: usize) -> String {
    let context: Vec<String> = hits
        .iter()
        .take(context_size)
        .enumerate()
        .map(|(i, hit)| format!("[{}] {}", i + 1, hit.content))
        .collect();

    format!(
        "Based on the following search results, provide a concise summary \
         answering the query: \"{query}\"\n\nSearch Results:\n{context}\n\nSummary:",
        query = query,
        context = context.join("\n\n"),
    )
}
