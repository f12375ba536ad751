//! Domain types shared by the retrieval, classification and answering crates.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Sector code and tag used when nothing more specific could be determined.
pub const AGNOSTIC: &str = "Agnostic";

/// An immutable unit of retrievable knowledge.
///
/// - `id`: unique within its knowledge base (`<doc stem>:<chunk index>`)
/// - `source`: opaque source identifier, usually the original file path
/// - `content`: the text payload handed to the reranker and the prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub id: ChunkId,
    pub source: String,
    pub content: String,
}

impl TextChunk {
    pub fn new(id: impl Into<String>, source: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), source: source.into(), content: content.into() }
    }
}

/// A chunk paired with the reranker score it was ordered by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    pub score: f32,
}

/// Outcome of classifying a company description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub sector_code: String,
    pub sector_tag: String,
}

impl ClassificationResult {
    pub fn agnostic() -> Self {
        Self { sector_code: AGNOSTIC.to_string(), sector_tag: AGNOSTIC.to_string() }
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Conversation state handed to the answer engine by the calling layer.
///
/// Owned by the caller; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub company_description: String,
    pub sector_code: String,
    pub sector_tag: String,
    pub history: Vec<Turn>,
}

impl ConversationState {
    pub fn new(company_description: impl Into<String>, classification: ClassificationResult) -> Self {
        Self {
            company_description: company_description.into(),
            sector_code: classification.sector_code,
            sector_tag: classification.sector_tag,
            history: Vec::new(),
        }
    }

    pub fn push_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.history.push(Turn { question: question.into(), answer: answer.into() });
    }

    /// Reporting standards that apply, as shown to the model and the user.
    pub fn standards_line(&self) -> String {
        if self.sector_tag == AGNOSTIC {
            "Agnostic Standards".to_string()
        } else {
            format!("Agnostic Standards + {}", self.sector_tag)
        }
    }

    /// Flatten the conversation into prompt lines.
    ///
    /// The description and standards lines are always present; only the most
    /// recent `max_turns` question/answer pairs follow them.
    pub fn flattened_history(&self, max_turns: usize) -> Vec<String> {
        let mut lines = Vec::with_capacity(2 + 2 * max_turns.min(self.history.len()));
        lines.push(format!("Company description: {}", self.company_description));
        lines.push(format!("ESRS standards to follow: {}", self.standards_line()));
        let skip = self.history.len().saturating_sub(max_turns);
        for turn in self.history.iter().skip(skip) {
            lines.push(format!("Q: {}", turn.question));
            lines.push(format!("A: {}", turn.answer));
        }
        lines
    }
}

/// Result of answering one question.
///
/// `context_used` is empty when retrieval itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub answer_html: String,
    pub context_used: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_turns(n: usize) -> ConversationState {
        let mut state = ConversationState::new(
            "We haul freight by truck",
            ClassificationResult { sector_code: "H49.4".into(), sector_tag: "Road Transport".into() },
        );
        for i in 0..n {
            state.push_turn(format!("q{i}"), format!("a{i}"));
        }
        state
    }

    #[test]
    fn standards_line_for_special_sector() {
        let state = state_with_turns(0);
        assert_eq!(state.standards_line(), "Agnostic Standards + Road Transport");
        let plain = ConversationState::new("x", ClassificationResult::agnostic());
        assert_eq!(plain.standards_line(), "Agnostic Standards");
    }

    #[test]
    fn flattened_history_keeps_preamble_and_last_turns() {
        let state = state_with_turns(4);
        let lines = state.flattened_history(2);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Company description: We haul freight by truck");
        assert_eq!(lines[1], "ESRS standards to follow: Agnostic Standards + Road Transport");
        assert_eq!(lines[2], "Q: q2");
        assert_eq!(lines[5], "A: a3");
    }

    #[test]
    fn flattened_history_with_zero_cap_has_only_preamble() {
        let lines = state_with_turns(3).flattened_history(0);
        assert_eq!(lines.len(), 2);
    }
}
