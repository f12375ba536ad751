//! Fixed instructions sent to the model.

/// System message on every completion call.
pub const SYSTEM_INSTRUCTION: &str = "Be brief. Only return the most COMPLETE and accurate answer. \
Avoid introductions, and additional context. No need to introduce a summary at the end.";

/// Shown in place of a model reply whenever the call fails.
pub const APOLOGY: &str = "I'm sorry, I encountered an error processing your request. Please try again later.";

pub fn classification_prompt(description: &str, context: &str) -> String {
    format!(
        "You are a NACE classification assistant.
Your job is to identify and return the exact NACE code.

Instructions:
- Analyze the company description.
- Use the context provided for reference.
- Respond with ONLY the NACE code (e.g., 'A01.1' or 'B05').
- Don't forget to include the letter

Company description:
{description}

Context:
{context}
"
    )
}

pub fn answer_prompt(question: &str, context: &str, history: &[String]) -> String {
    let history = history.join("\n");
    format!(
        "Instructions:
- Follow the ESRS standards.
- Use the context provided for reference.
- No need to include summary tables
- Answer must be complete and accurate
- Explain the answer in detail
- Give brief and concise answers
- Prioritize information quality over aesthetics
- Don't say what was provided in context
- Give answer in markdown format
- Don't include numeric lists, only bullet points
Question: {question}
Context:
{context}
Take into account the previous conversation:
{history}
"
    )
}
