//! Cross-encoder reranking.
//!
//! `CrossEncoderReranker` runs a BERT sequence-classification checkpoint
//! (e.g. `cross-encoder/ms-marco-MiniLM-L6-v2`) over the joint
//! `[CLS] query [SEP] passage [SEP]` encoding and returns the sigmoid of the
//! single relevance logit. Pairs longer than the configured token cap are
//! truncated longest-side first, which in practice cuts the passage.

use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use candle_core::{DType, Device, IndexOp};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{Tokenizer, TruncationParams, TruncationStrategy};
use tracing::info;

use sectordb_core::config::RerankerSettings;
use sectordb_core::traits::Reranker;

use crate::{device, env_flag, hidden_size, load_weights, tokenize};

pub struct CrossEncoderReranker {
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoderReranker {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), max_len, "loading cross-encoder reranker");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: max_len, strategy: TruncationStrategy::LongestFirst, ..Default::default() }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        tokenizer.with_padding(None);

        let config_text = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: BertConfig = serde_json::from_str(&config_text)?;
        let hidden = hidden_size(&config_text)?;
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb.pp("bert"), &config)?;
        let pooler = candle_nn::linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
        let classifier = candle_nn::linear(hidden, 1, vb.pp("classifier"))?;
        info!("✅ reranker loaded");
        Ok(Self { model, pooler, classifier, tokenizer, device })
    }

    fn logit(&self, query: &str, passage: &str) -> Result<f32> {
        let (input_ids, token_type_ids, attention_mask) = tokenize::tokenize_pair_on_device(&self.tokenizer, query, passage, &self.device)?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        Ok(logits.to_dtype(DType::F32)?.flatten_all()?.i(0)?.to_scalar::<f32>()?)
    }
}

impl Reranker for CrossEncoderReranker {
    fn score(&self, query: &str, passage: &str) -> Result<f32> {
        let logit = self.logit(query, passage)?;
        Ok(1.0 / (1.0 + (-logit).exp()))
    }
}

/// Token-overlap scorer: share of distinct query terms found in the passage.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalReranker;

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).map(str::to_lowercase).collect()
}

impl Reranker for LexicalReranker {
    fn score(&self, query: &str, passage: &str) -> Result<f32> {
        let query_terms = terms(query);
        if query_terms.is_empty() { return Ok(0.0); }
        let passage_terms = terms(passage);
        let hits = query_terms.iter().filter(|t| passage_terms.contains(*t)).count();
        Ok(hits as f32 / query_terms.len() as f32)
    }
}

/// Build the configured reranker. `APP_USE_FAKE_RERANKER=1` forces the lexical scorer.
pub fn load_reranker(settings: &RerankerSettings) -> Result<Arc<dyn Reranker>> {
    if settings.fake || env_flag("APP_USE_FAKE_RERANKER") { info!("🧪 Using LexicalReranker"); return Ok(Arc::new(LexicalReranker)); }
    Ok(Arc::new(CrossEncoderReranker::load(&settings.model_dir, settings.max_len)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_score_is_share_of_query_terms() {
        let r = LexicalReranker;
        let s = r.score("offshore oil drilling", "Oil extraction from offshore platforms").unwrap();
        assert!((s - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(r.score("", "anything").unwrap(), 0.0);
        assert_eq!(r.score("road", "").unwrap(), 0.0);
    }

    #[test]
    fn lexical_score_is_deterministic() {
        let r = LexicalReranker;
        let a = r.score("GHG emissions scope 3", "Scope 3 GHG emissions cover the value chain").unwrap();
        let b = r.score("GHG emissions scope 3", "Scope 3 GHG emissions cover the value chain").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, 1.0);
    }
}
