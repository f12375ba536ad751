//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys use `__`, e.g. `APP_LLM__MODEL`). Every setting has a default so
//! an empty configuration is valid. Path settings expand `~` and `${VAR}` and
//! are resolved against the directory the configuration was loaded from.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load `config.toml` and the environment overlay found in `dir`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: dir.to_path_buf() };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Build a configuration from an inline TOML document (no env overlay).
    pub fn from_toml_str(toml: &str, base_dir: &Path) -> Self {
        Self { figment: Figment::new().merge(Toml::string(toml)), base_dir: base_dir.to_path_buf() }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract the typed settings with all paths resolved.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.resolve_paths(&self.base_dir);
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        match env {
            "prod" | "production" => {
                for key in ["embedding.fake", "reranker.fake"] {
                    if self.get::<bool>(key).unwrap_or(false) {
                        return Err(Error::InvalidConfig(format!("{} is not allowed in production", key)).into());
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub knowledge: KnowledgeSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
}

impl Settings {
    fn resolve_paths(&mut self, base: &Path) {
        self.knowledge.root_dir = resolve_with_base(base, self.knowledge.root_dir.to_string_lossy());
        self.knowledge.taxonomy_path = resolve_with_base(base, self.knowledge.taxonomy_path.to_string_lossy());
        self.embedding.model_dir = resolve_with_base(base, self.embedding.model_dir.to_string_lossy());
        self.reranker.model_dir = resolve_with_base(base, self.reranker.model_dir.to_string_lossy());
    }

    fn validate(&self) -> anyhow::Result<()> {
        let r = &self.retrieval;
        if r.classify_k == 0 || r.answer_k == 0 {
            return Err(Error::InvalidConfig("retrieval k must be positive".into()).into());
        }
        if r.classify_keep > r.classify_k || r.answer_keep > r.answer_k {
            return Err(Error::InvalidConfig("retrieval keep must not exceed k".into()).into());
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::InvalidConfig("llm.timeout_secs must be positive".into()).into());
        }
        Ok(())
    }
}

/// Where the knowledge bases live and how sectors map onto them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    pub root_dir: PathBuf,
    pub default_index: String,
    pub classification_index: String,
    pub taxonomy_path: PathBuf,
    /// Sector tag -> knowledge base name.
    pub sectors: BTreeMap<String, String>,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        let sectors = [
            ("Oil & Gas Company", "oil_gas_db"),
            ("Mining, Quarrying and Coal", "mining_db"),
            ("Road Transport", "road_db"),
        ]
        .into_iter()
        .map(|(tag, db)| (tag.to_string(), db.to_string()))
        .collect();
        Self {
            root_dir: PathBuf::from("vectorstores"),
            default_index: "default_db".to_string(),
            classification_index: "nace_db".to_string(),
            taxonomy_path: PathBuf::from("sector_classification.json"),
            sectors,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: PathBuf,
    pub max_len: usize,
    pub fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: PathBuf::from("models/bge-m3"), max_len: 256, fake: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub model_dir: PathBuf,
    /// Token cap for the (query, passage) pair, truncated longest side first.
    pub max_len: usize,
    pub fake: bool,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self { model_dir: PathBuf::from("models/ms-marco-MiniLM-L6-v2"), max_len: 512, fake: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub top_p: f32,
    pub max_tokens: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://integrate.api.nvidia.com/v1".to_string(),
            model: "nvidia/llama-3.3-nemotron-super-49b-v1".to_string(),
            api_key_env: "NVIDIA_API_KEY".to_string(),
            timeout_secs: 120,
            top_p: 0.1,
            max_tokens: 4096,
            frequency_penalty: 0.1,
            presence_penalty: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub classify_k: usize,
    pub classify_keep: usize,
    pub answer_k: usize,
    pub answer_keep: usize,
    /// Question/answer pairs embedded in the answer prompt.
    pub history_turns: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { classify_k: 3, classify_keep: 3, answer_k: 10, answer_keep: 5, history_turns: 10 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_yields_defaults() {
        let settings = Config::from_toml_str("", Path::new("/srv/app")).settings().expect("settings");
        assert_eq!(settings.retrieval.answer_k, 10);
        assert_eq!(settings.retrieval.answer_keep, 5);
        assert_eq!(settings.knowledge.root_dir, PathBuf::from("/srv/app/vectorstores"));
        assert_eq!(settings.knowledge.sectors.get("Road Transport").map(String::as_str), Some("road_db"));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let toml = r#"
            [llm]
            model = "local-model"
            timeout_secs = 5

            [knowledge]
            root_dir = "/data/kb"
        "#;
        let settings = Config::from_toml_str(toml, Path::new("/srv/app")).settings().expect("settings");
        assert_eq!(settings.llm.model, "local-model");
        assert_eq!(settings.llm.timeout_secs, 5);
        assert_eq!(settings.llm.api_key_env, "NVIDIA_API_KEY");
        assert_eq!(settings.knowledge.root_dir, PathBuf::from("/data/kb"));
        assert_eq!(settings.knowledge.default_index, "default_db");
    }

    #[test]
    fn keep_larger_than_k_is_rejected() {
        let toml = "[retrieval]\nanswer_k = 3\nanswer_keep = 5\n";
        assert!(Config::from_toml_str(toml, Path::new(".")).settings().is_err());
    }

    #[test]
    fn production_rejects_any_fake_model() {
        let embed = Config::from_toml_str("[embedding]\nfake = true\n", Path::new("."));
        assert!(embed.validate_for_env("prod").is_err());
        let rerank = Config::from_toml_str("[reranker]\nfake = true\n", Path::new("."));
        let err = rerank.validate_for_env("production").unwrap_err();
        assert!(err.to_string().contains("reranker.fake"));
        assert!(rerank.validate_for_env("dev").is_ok());
        assert!(Config::from_toml_str("", Path::new(".")).validate_for_env("prod").is_ok());
    }

    #[test]
    fn resolve_with_base_keeps_absolute_paths() {
        assert_eq!(resolve_with_base(Path::new("/base"), "/abs/x"), PathBuf::from("/abs/x"));
        assert_eq!(resolve_with_base(Path::new("/base"), "rel/x"), PathBuf::from("/base/rel/x"));
    }
}
