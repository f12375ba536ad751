//! sectordb-rag
//!
//! Sector classification and retrieval-augmented answering over the knowledge
//! bases held by an `IndexRegistry`.

pub mod answer;
pub mod chat;
pub mod classify;
pub mod prompt;
pub mod registry;
pub mod render;
pub mod rerank;
pub mod store;
pub mod taxonomy;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use sectordb_core::config::{RetrievalSettings, Settings};
use sectordb_core::traits::{CompletionClient, Reranker};
use sectordb_embed::{load_embedder, load_reranker};
use sectordb_llm::OpenAiCompatibleClient;

pub use answer::AnswerEngine;
pub use chat::{ChatReply, ChatService};
pub use classify::{CodeExtractor, SectorClassifier};
pub use registry::IndexRegistry;
pub use store::{ConversationStore, MemoryConversationStore};
pub use taxonomy::SectorTaxonomy;

/// Everything a request handler needs, built once at startup.
pub struct Pipeline {
    pub registry: Arc<IndexRegistry>,
    pub classifier: Arc<SectorClassifier>,
    pub engine: Arc<AnswerEngine>,
}

impl Pipeline {
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = load_embedder(&settings.embedding)?;
        let reranker = load_reranker(&settings.reranker)?;
        let llm: Arc<dyn CompletionClient> = Arc::new(OpenAiCompatibleClient::from_settings(&settings.llm)?);
        let taxonomy = SectorTaxonomy::load(&settings.knowledge.taxonomy_path)?;
        let registry = IndexRegistry::load(&settings.knowledge, embedder).await?;
        info!(model = %settings.llm.model, "🚀 pipeline ready");
        Self::from_parts(registry, taxonomy, reranker, llm, &settings.retrieval)
    }

    pub fn from_parts(
        registry: IndexRegistry,
        taxonomy: SectorTaxonomy,
        reranker: Arc<dyn Reranker>,
        llm: Arc<dyn CompletionClient>,
        retrieval: &RetrievalSettings,
    ) -> Result<Self> {
        let registry = Arc::new(registry);
        let classifier = SectorClassifier::new(
            registry.classification(),
            reranker.clone(),
            llm.clone(),
            Arc::new(taxonomy),
            retrieval.classify_k,
            retrieval.classify_keep,
        )?;
        let engine = AnswerEngine::new(
            registry.clone(),
            reranker,
            llm,
            retrieval.answer_k,
            retrieval.answer_keep,
            retrieval.history_turns,
        );
        Ok(Self { registry, classifier: Arc::new(classifier), engine: Arc::new(engine) })
    }

    pub fn chat_service(&self, store: Arc<dyn ConversationStore>) -> ChatService {
        ChatService::new(self.classifier.clone(), self.engine.clone(), store)
    }
}
