//! Grounded answer generation.
//!
//! The generation model only ever sees the retrieved passages plus the
//! question; source attribution is computed from the retrieved set
//! before generation starts and never parsed out of model output.

use grimoire_llm::{ChatStream, LlmProvider, Message};

use crate::error::{RagError, Result};
use crate::types::{Answer, ScoredChunk, SourcePassage};

const GROUNDED_SYSTEM_PROMPT: &str = "You answer questions using only the provided context \
passages. If the context does not contain the answer, say that you do not know. Do not use \
outside knowledge and do not invent citations.";

const UNGROUNDED_SYSTEM_PROMPT: &str = "You answer questions from general knowledge. No \
reference documents are available, so say so when the question needs them.";

/// An answer being streamed out. `sources` and `grounded` are final
/// before the first token arrives.
pub struct StreamingAnswer {
    pub sources: Vec<SourcePassage>,
    pub grounded: bool,
    pub stream: ChatStream,
}

pub struct Synthesizer<'a, P> {
    provider: &'a P,
    allow_ungrounded: bool,
}

impl<'a, P: LlmProvider> Synthesizer<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P, allow_ungrounded: bool) -> Self {
        Self {
            provider,
            allow_ungrounded,
        }
    }

    /// Generate an answer conditioned on `retrieved`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NoContext`] when nothing was retrieved and
    /// ungrounded answers are disabled, or [`RagError::Llm`] when
    /// generation fails.
    pub async fn answer(&self, query: &str, retrieved: &[ScoredChunk]) -> Result<Answer> {
        let (messages, sources, grounded) = self.prepare(query, retrieved)?;
        let text = self.provider.chat(&messages).await?;
        Ok(Answer {
            query: query.to_owned(),
            text,
            sources,
            grounded,
        })
    }

    /// Streaming variant of [`Synthesizer::answer`]. Attribution is
    /// fixed up front so callers can print sources after the stream
    /// without waiting on generation state.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Synthesizer::answer`].
    pub async fn answer_stream(
        &self,
        query: &str,
        retrieved: &[ScoredChunk],
    ) -> Result<StreamingAnswer> {
        let (messages, sources, grounded) = self.prepare(query, retrieved)?;
        let stream = self.provider.chat_stream(&messages).await?;
        Ok(StreamingAnswer {
            sources,
            grounded,
            stream,
        })
    }

    fn prepare(
        &self,
        query: &str,
        retrieved: &[ScoredChunk],
    ) -> Result<(Vec<Message>, Vec<SourcePassage>, bool)> {
        if retrieved.is_empty() {
            if !self.allow_ungrounded {
                return Err(RagError::NoContext);
            }
            tracing::warn!("answering without retrieved context");
            let messages = vec![
                Message::system(UNGROUNDED_SYSTEM_PROMPT),
                Message::user(format!("Question: {query}")),
            ];
            return Ok((messages, Vec::new(), false));
        }

        let sources: Vec<SourcePassage> =
            retrieved.iter().map(|s| SourcePassage::from(&s.chunk)).collect();
        let messages = vec![
            Message::system(GROUNDED_SYSTEM_PROMPT),
            Message::user(build_prompt(query, retrieved)),
        ];
        Ok((messages, sources, true))
    }
}

/// One labelled block per retrieved passage, in rank order, followed by
/// the question.
fn build_prompt(query: &str, retrieved: &[ScoredChunk]) -> String {
    let mut prompt = String::from("Context passages:\n");
    for scored in retrieved {
        prompt.push_str("\n--- ");
        prompt.push_str(&scored.chunk.source);
        prompt.push_str(" ---\n");
        prompt.push_str(&scored.chunk.content);
        prompt.push('\n');
    }
    prompt.push_str("\nQuestion: ");
    prompt.push_str(query);
    prompt
}
