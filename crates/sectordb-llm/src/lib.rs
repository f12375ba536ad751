//! sectordb-llm
//!
//! Chat-completions client for any OpenAI-compatible endpoint (NVIDIA NIM,
//! OpenAI, vLLM, Ollama, llama.cpp server). Only the request/response shape
//! of `/chat/completions` is assumed; callers see the `CompletionClient`
//! trait and nothing else.

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use sectordb_core::config::LlmSettings;
use sectordb_core::error::Error;
use sectordb_core::traits::CompletionClient;

const CHAT_PATH: &str = "/chat/completions";

/// Sampling knobs sent with every request. Temperature comes per call.
#[derive(Debug, Clone, PartialEq)]
pub struct Sampling {
    pub top_p: f32,
    pub max_tokens: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl From<&LlmSettings> for Sampling {
    fn from(s: &LlmSettings) -> Self {
        Self { top_p: s.top_p, max_tokens: s.max_tokens, frequency_penalty: s.frequency_penalty, presence_penalty: s.presence_penalty }
    }
}

pub struct OpenAiCompatibleClient {
    base_url: String,
    model: String,
    /// Empty means the endpoint takes no auth (local servers).
    api_key: String,
    sampling: Sampling,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    /// Build from settings; the key is read from the env var named by
    /// `api_key_env`, never from the config file itself.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).unwrap_or_default();
        if api_key.is_empty() {
            warn!(env = %settings.api_key_env, "no API key set; requests go out unauthenticated");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
            sampling: Sampling::from(settings),
            client,
        })
    }

    pub fn model(&self) -> &str { &self.model }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() { req } else { req.bearer_auth(&self.api_key) }
    }
}

/// Request body: one system message, one user message, non-streaming.
pub fn build_body(model: &str, system_instruction: &str, prompt: &str, temperature: f32, sampling: &Sampling) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system_instruction },
            { "role": "user", "content": prompt },
        ],
        "temperature": temperature,
        "top_p": sampling.top_p,
        "max_tokens": sampling.max_tokens,
        "frequency_penalty": sampling.frequency_penalty,
        "presence_penalty": sampling.presence_penalty,
        "stream": false,
    })
}

/// Text of the first choice. A missing or non-string `content` is an error;
/// an empty string is returned as-is.
pub fn parse_completion(body: &Value) -> Result<String> {
    if let Some(err) = body.get("error") {
        let msg = err["message"].as_str().map(String::from).unwrap_or_else(|| err.to_string());
        return Err(Error::LlmCall(msg).into());
    }
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| Error::LlmCall("no choices in response".into()))?;
    let content = choice["message"]["content"]
        .as_str()
        .ok_or_else(|| Error::LlmCall("first choice has no text content".into()))?;
    Ok(content.to_string())
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(&self, system_instruction: &str, prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}{}", self.base_url, CHAT_PATH);
        let body = build_body(&self.model, system_instruction, prompt, temperature, &self.sampling);
        let started = Instant::now();
        let req = self.apply_auth(self.client.post(&url).json(&body));
        let resp = req
            .send()
            .await
            .map_err(|e| Error::LlmCall(format!("request to {} failed: {}", url, e)))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::LlmCall(format!("{} returned {}: {}", self.model, status, text)).into());
        }
        let json: Value = resp.json().await.map_err(|e| Error::LlmCall(format!("invalid response body: {}", e)))?;
        let text = parse_completion(&json)?;
        debug!(model = %self.model, elapsed_ms = started.elapsed().as_millis() as u64, chars = text.len(), "completion received");
        Ok(text)
    }
}
