//! Retrieval-augmented answers within an established sector.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use sectordb_core::traits::{ChunkSource, CompletionClient, Reranker};
use sectordb_core::types::{AnswerOutcome, ConversationState};

use crate::prompt::{answer_prompt, APOLOGY, SYSTEM_INSTRUCTION};
use crate::registry::IndexRegistry;
use crate::render::markdown_to_html;
use crate::rerank::{join_context, rerank_blocking};

pub struct AnswerEngine {
    registry: Arc<IndexRegistry>,
    reranker: Arc<dyn Reranker>,
    llm: Arc<dyn CompletionClient>,
    k: usize,
    keep: usize,
    history_turns: usize,
}

impl AnswerEngine {
    pub fn new(
        registry: Arc<IndexRegistry>,
        reranker: Arc<dyn Reranker>,
        llm: Arc<dyn CompletionClient>,
        k: usize,
        keep: usize,
        history_turns: usize,
    ) -> Self {
        Self { registry, reranker, llm, k, keep, history_turns }
    }

    /// Answer `question` for the session described by `state`.
    ///
    /// Never fails. A retrieval failure yields the apology with empty context;
    /// an LLM failure yields the apology with the context that was retrieved.
    /// The caller appends `(question, answer_html)` to the session history.
    pub async fn answer(&self, question: &str, state: &ConversationState) -> AnswerOutcome {
        let started = Instant::now();
        let source = self.registry.merged_view(&state.sector_tag);
        let hits = match source.similarity_search(question, self.k).await {
            Ok(hits) => hits,
            Err(e) => {
                error!(index = %source.name(), error = %e, "answer retrieval failed");
                return AnswerOutcome { answer_html: APOLOGY.to_string(), context_used: String::new() };
            }
        };
        let ranked = rerank_blocking(&self.reranker, question, hits, self.keep).await;
        let context = join_context(&ranked);

        let history = state.flattened_history(self.history_turns);
        let prompt = answer_prompt(question, &context, &history);
        let answer_html = match self.llm.complete(SYSTEM_INSTRUCTION, &prompt, 0.0).await {
            Ok(raw) => markdown_to_html(raw.trim()),
            Err(e) => {
                error!(error = %e, "answer LLM call failed");
                APOLOGY.to_string()
            }
        };
        info!(
            index = %source.name(),
            sector = %state.sector_tag,
            context_chunks = ranked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "💬 question answered"
        );
        AnswerOutcome { answer_html, context_used: context }
    }
}
