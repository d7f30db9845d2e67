//! Generator trait for producing grounded answers.

use async_trait::async_trait;

use crate::error::Result;
use crate::query::SourcePassage;

/// Answer returned when retrieval finds nothing to ground a response in.
pub const NO_CONTEXT_ANSWER: &str =
    "I don't have enough information in the knowledge base to answer this question.";

/// System instruction shared by chat-based generators.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions using only \
the provided context. If the context does not contain the answer, say that you don't know. \
Keep answers concise and do not invent facts.";

/// A generation model that answers a question from context passages.
///
/// Calls are expected to be I/O bound. The pipeline wraps every call in a
/// timeout and drops the future when it fires, so implementations must not
/// rely on running to completion.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Produce an answer to `question` grounded in `passages`.
    async fn generate(&self, question: &str, passages: &[SourcePassage]) -> Result<String>;
}

/// Build the user prompt: numbered context passages followed by the question.
pub fn build_grounded_prompt(question: &str, passages: &[SourcePassage]) -> String {
    let mut prompt = String::from("Context:\n");
    for (i, passage) in passages.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n\n", i + 1, passage.content.trim()));
    }
    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt.push_str("\n\nAnswer:");
    prompt
}
