//! Prompt templates

use qrag_core::{ChatRole, PromptTemplate};

/// Two-role prompt asking the model to answer from the retrieved context.
/// Variables: `context`, `question`.
pub fn answer_with_context_prompt() -> PromptTemplate {
    PromptTemplate::from_messages([
        (ChatRole::System, ""),
        (ChatRole::Human, "### Context\n{context}\n### Question\n{question}"),
    ])
}
