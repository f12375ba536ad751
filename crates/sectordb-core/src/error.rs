use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load index '{name}': {reason}")]
    IndexLoad { name: String, reason: String },

    #[error("Invalid sector taxonomy: {0}")]
    Taxonomy(String),

    #[error("LLM call failed: {0}")]
    LlmCall(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn index_load(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::IndexLoad { name: name.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
