//! Company description -> classification code -> sector tag.

use std::sync::Arc;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, error, info, warn};

use sectordb_core::traits::{ChunkSource, CompletionClient, Reranker};
use sectordb_core::types::{ClassificationResult, AGNOSTIC};

use crate::prompt::{classification_prompt, APOLOGY, SYSTEM_INSTRUCTION};
use crate::rerank::{join_context, rerank_blocking};
use crate::taxonomy::SectorTaxonomy;

/// Pulls a classification code (`B06`, `A01.1`, `C20.1.3`) out of free model text.
pub struct CodeExtractor {
    lowercase_letter: Regex,
    dot_space: Regex,
    code: Regex,
}

impl CodeExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // a lone section letter, or one directly followed by its division digits
            lowercase_letter: Regex::new(r"\b([a-u])(\d{0,2})\b")?,
            dot_space: Regex::new(r"\.\s+")?,
            code: Regex::new(r"\b([A-U]\d{1,2}(?:\.\d{1,2}){0,2})")?,
        })
    }

    /// Uppercase section letters and close `B05. 2` into `B05.2`.
    pub fn normalize(&self, raw: &str) -> String {
        let upper = self.lowercase_letter.replace_all(raw, |c: &regex::Captures| {
            format!("{}{}", c[1].to_ascii_uppercase(), &c[2])
        });
        self.dot_space.replace_all(&upper, ".").into_owned()
    }

    /// First code in `raw` after normalization.
    pub fn extract(&self, raw: &str) -> Option<String> {
        let normalized = self.normalize(raw);
        self.code.captures(&normalized).map(|c| c[1].to_string())
    }
}

pub struct SectorClassifier {
    index: Option<Arc<dyn ChunkSource>>,
    reranker: Arc<dyn Reranker>,
    llm: Arc<dyn CompletionClient>,
    taxonomy: Arc<SectorTaxonomy>,
    extractor: CodeExtractor,
    k: usize,
    keep: usize,
}

impl SectorClassifier {
    pub fn new(
        index: Option<Arc<dyn ChunkSource>>,
        reranker: Arc<dyn Reranker>,
        llm: Arc<dyn CompletionClient>,
        taxonomy: Arc<SectorTaxonomy>,
        k: usize,
        keep: usize,
    ) -> Result<Self> {
        Ok(Self { index, reranker, llm, taxonomy, extractor: CodeExtractor::new()?, k, keep })
    }

    /// Never fails: anything that goes wrong ends in the Agnostic result.
    pub async fn classify(&self, description: &str) -> ClassificationResult {
        let Some(index) = &self.index else {
            warn!("no classification index loaded; using Agnostic");
            return ClassificationResult::agnostic();
        };
        let context = match index.similarity_search(description, self.k).await {
            Ok(hits) => join_context(&rerank_blocking(&self.reranker, description, hits, self.keep).await),
            Err(e) => {
                error!(index = %index.name(), error = %e, "classification retrieval failed; asking without context");
                String::new()
            }
        };
        let prompt = classification_prompt(description, &context);
        let raw = match self.llm.complete(SYSTEM_INSTRUCTION, &prompt, 0.0).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!(error = %e, "classification LLM call failed");
                APOLOGY.to_string()
            }
        };
        debug!(raw = %raw, "classification model output");
        self.resolve(&raw)
    }

    /// Map raw model output to a result through the taxonomy.
    pub fn resolve(&self, raw: &str) -> ClassificationResult {
        match self.extractor.extract(raw) {
            Some(code) => {
                let tag = self.taxonomy.tag_for(&code).to_string();
                info!(code = %code, tag = %tag, "🏭 company classified");
                ClassificationResult { sector_code: code, sector_tag: tag }
            }
            None => {
                warn!("no classification code in model output; using Agnostic");
                ClassificationResult { sector_code: AGNOSTIC.to_string(), sector_tag: AGNOSTIC.to_string() }
            }
        }
    }
}
