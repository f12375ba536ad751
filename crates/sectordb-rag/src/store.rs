//! Persistence boundary for conversations.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use sectordb_core::error::Error;
use sectordb_core::types::{ClassificationResult, ConversationState, Turn};

/// What a session was classified as, and from which description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClassification {
    pub sector_code: String,
    pub sector_tag: String,
    pub company_description: String,
}

/// Implemented by whatever owns sessions (web layer, database).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Record a new session's description and classification.
    async fn start(&self, session_id: &str, description: &str, classification: &ClassificationResult) -> Result<()>;
    async fn append(&self, session_id: &str, question: &str, answer: &str) -> Result<()>;
    async fn history(&self, session_id: &str) -> Result<Vec<Turn>>;
    async fn classification(&self, session_id: &str) -> Result<Option<SessionClassification>>;
}

/// Assemble the typed state the answer engine reads.
pub async fn load_state(store: &dyn ConversationStore, session_id: &str) -> Result<Option<ConversationState>> {
    let Some(c) = store.classification(session_id).await? else { return Ok(None) };
    let history = store.history(session_id).await?;
    Ok(Some(ConversationState {
        company_description: c.company_description,
        sector_code: c.sector_code,
        sector_tag: c.sector_tag,
        history,
    }))
}

/// Process-local store. Concurrent appends to one session are last-write-wins
/// in arrival order; there is no per-session lock.
#[derive(Default)]
pub struct MemoryConversationStore {
    sessions: RwLock<HashMap<String, ConversationState>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.sessions.read().len() }

    pub fn is_empty(&self) -> bool { self.sessions.read().is_empty() }

    pub fn remove(&self, session_id: &str) -> bool { self.sessions.write().remove(session_id).is_some() }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn start(&self, session_id: &str, description: &str, classification: &ClassificationResult) -> Result<()> {
        let state = ConversationState::new(description, classification.clone());
        self.sessions.write().insert(session_id.to_string(), state);
        Ok(())
    }

    async fn append(&self, session_id: &str, question: &str, answer: &str) -> Result<()> {
        let mut sessions = self.sessions.write();
        let state = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(format!("session '{}'", session_id)))?;
        state.push_turn(question, answer);
        Ok(())
    }

    async fn history(&self, session_id: &str) -> Result<Vec<Turn>> {
        Ok(self.sessions.read().get(session_id).map(|s| s.history.clone()).unwrap_or_default())
    }

    async fn classification(&self, session_id: &str) -> Result<Option<SessionClassification>> {
        Ok(self.sessions.read().get(session_id).map(|s| SessionClassification {
            sector_code: s.sector_code.clone(),
            sector_tag: s.sector_tag.clone(),
            company_description: s.company_description.clone(),
        }))
    }
}
