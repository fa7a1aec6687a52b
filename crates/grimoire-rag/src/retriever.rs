//! Query-time retrieval: embed the question, rank indexed chunks.

use grimoire_llm::LlmProvider;

use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::types::ScoredChunk;

pub struct Retriever<'a, P> {
    provider: &'a P,
    index: &'a VectorIndex,
}

impl<'a, P: LlmProvider> Retriever<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P, index: &'a VectorIndex) -> Self {
        Self { provider, index }
    }

    /// Embed `query` and return the `k` most similar chunks, best first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Llm`] when the embedding call fails and
    /// [`RagError::DimensionMismatch`] when the backend returns a vector
    /// of a different width than the index was built with.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let vector = self.provider.embed(query).await?;
        if vector.len() != self.index.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: self.index.dimension(),
                got: vector.len(),
            });
        }

        let results = self.index.query(&vector, k)?;
        tracing::debug!(
            k,
            returned = results.len(),
            top_score = results.first().map(|s| s.score),
            "retrieval complete"
        );
        Ok(results)
    }
}
