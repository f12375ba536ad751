//! First-message / follow-up conversation flow.
//!
//! The first message of a session is the company description: it is
//! classified and the session is started. Every later message is a question
//! answered against the session's sector.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tracing::info;

use sectordb_core::error::Error;

use crate::answer::AnswerEngine;
use crate::classify::SectorClassifier;
use crate::store::{load_state, ConversationStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub answer: String,
    pub context: String,
    pub is_first_message: bool,
}

impl ChatReply {
    /// `{"answer", "context", "is_first_message"}` as served to the web client.
    pub fn to_json(&self) -> Value {
        json!({ "answer": self.answer, "context": self.context, "is_first_message": self.is_first_message })
    }
}

pub fn welcome_message(sector_code: &str) -> String {
    format!(
        "Thank you for your company description. Based on my analysis, your company falls under NACE sector {}. \
How can I help you with your ESRS reporting requirements?",
        sector_code
    )
}

pub struct ChatService {
    classifier: Arc<SectorClassifier>,
    engine: Arc<AnswerEngine>,
    store: Arc<dyn ConversationStore>,
}

impl ChatService {
    pub fn new(classifier: Arc<SectorClassifier>, engine: Arc<AnswerEngine>, store: Arc<dyn ConversationStore>) -> Self {
        Self { classifier, engine, store }
    }

    /// Errors only come from the store or an empty message; model and
    /// retrieval failures surface as apology text.
    pub async fn handle_message(&self, session_id: &str, message: &str) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::Operation("no message provided".into()).into());
        }
        match load_state(self.store.as_ref(), session_id).await? {
            None => {
                let classification = self.classifier.classify(message).await;
                self.store.start(session_id, message, &classification).await?;
                info!(session = %session_id, code = %classification.sector_code, tag = %classification.sector_tag, "session started");
                Ok(ChatReply { answer: welcome_message(&classification.sector_code), context: String::new(), is_first_message: true })
            }
            Some(state) => {
                let outcome = self.engine.answer(message, &state).await;
                self.store.append(session_id, message, &outcome.answer_html).await?;
                Ok(ChatReply { answer: outcome.answer_html, context: outcome.context_used, is_first_message: false })
            }
        }
    }
}
