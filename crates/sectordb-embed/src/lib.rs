//! sectordb-embed
//!
//! Local neural models behind the `Embedder` and `Reranker` seams: a BGE-M3
//! bi-encoder for vector search and an ms-marco MiniLM cross-encoder for
//! reranking, both run with candle. Deterministic fakes stand in for them in
//! tests and development.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use candle_core::{Device, Tensor, DType};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{XLMRobertaModel, Config as XLMRobertaConfig};
use tokenizers::Tokenizer;
use tracing::{info, warn};

use sectordb_core::config::EmbeddingSettings;
use sectordb_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod rerank;
pub mod tokenize;

pub use pool::masked_mean_l2;
pub use rerank::{CrossEncoderReranker, LexicalReranker, load_reranker};

const XLM_ROBERTA_PAD_ID: u32 = 1;

pub struct EmbeddingModel { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize }

impl EmbeddingModel {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), "loading BGE-M3 embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_text = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: XLMRobertaConfig = serde_json::from_str(&config_text)?;
        let dim = hidden_size(&config_text)?;
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!(dim, max_len, "✅ embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, self.max_len, XLM_ROBERTA_PAD_ID, &self.device)?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::U32, &self.device)?;
        let hidden_states = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden_states, &attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if emb.len() != self.dim { return Err(anyhow!("embedding width {} != model dim {}", emb.len(), self.dim)); }
        if start.elapsed().as_millis() > 100 { warn!(elapsed_ms = start.elapsed().as_millis() as u64, "⚠️  Slow embedding"); }
        Ok(emb)
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { texts.iter().map(|t| self.embed_text(t)).collect() }
}

/// Hash-based embedder: deterministic, L2-normalized, no model files needed.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder { pub fn new(dim: usize) -> Self { Self { dim } } }

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { 256 }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

impl FakeEmbedder {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() { let token = token.to_lowercase(); let mut hasher = XxHash64::with_seed(0); token.hash(&mut hasher); let h = hasher.finish(); let idx = (h as usize) % self.dim; let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32); v[idx] += val + (i as f32 % 3.0) * 0.01; }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6); for x in &mut v { *x /= norm; } v
    }
}

pub const FAKE_EMBEDDING_DIM: usize = 1024;

fn env_flag(name: &str) -> bool {
    std::env::var(name).ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Build the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces the fake.
pub fn load_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.fake || env_flag("APP_USE_FAKE_EMBEDDINGS") { info!("🧪 Using FakeEmbedder"); return Ok(Arc::new(FakeEmbedder::new(FAKE_EMBEDDING_DIM))); }
    Ok(Arc::new(EmbeddingModel::load(&settings.model_dir, settings.max_len)?))
}

/// `hidden_size` straight from a HF `config.json`.
pub(crate) fn hidden_size(config_text: &str) -> Result<usize> {
    let raw: serde_json::Value = serde_json::from_str(config_text)?;
    raw.get("hidden_size").and_then(|v| v.as_u64()).map(|v| v as usize).ok_or_else(|| anyhow!("config.json has no hidden_size"))
}

/// Load `model.safetensors` if present, else the PyTorch pickle.
pub(crate) fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)
        .map_err(|e| anyhow!("Failed to read weights from {}: {}", weights_path.display(), e))?;
    weights.into_iter().map(|(name, t)| Ok((name, t.to_device(device)?))).collect()
}
