//! Request and result types of a single question-answering call.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::SearchResult;
use crate::error::QueryError;

/// Maximum question length, in characters.
pub const MAX_QUESTION_CHARS: usize = 1000;

/// A validated question plus the flags that decide which stages run.
///
/// The only way to obtain a `Query` is [`Query::new`] (or deserializing
/// through it), so every instance satisfies the length bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QueryRequest")]
pub struct Query {
    question: String,
    include_sources: bool,
    enable_evaluation: bool,
}

impl Query {
    /// Validate and build a query.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Validation`] if the question is empty or longer
    /// than [`MAX_QUESTION_CHARS`] characters.
    pub fn new(
        question: impl Into<String>,
        include_sources: bool,
        enable_evaluation: bool,
    ) -> Result<Self, QueryError> {
        let question = question.into();
        let chars = question.chars().count();
        if chars == 0 {
            return Err(QueryError::Validation {
                field: "question",
                message: "question must contain at least 1 character".to_string(),
            });
        }
        if chars > MAX_QUESTION_CHARS {
            return Err(QueryError::Validation {
                field: "question",
                message: format!(
                    "question must contain at most {MAX_QUESTION_CHARS} characters, got {chars}"
                ),
            });
        }
        Ok(Self { question, include_sources, enable_evaluation })
    }

    /// The question text.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Whether the result should carry the retrieved passages.
    pub fn include_sources(&self) -> bool {
        self.include_sources
    }

    /// Whether the answer should be scored.
    pub fn enable_evaluation(&self) -> bool {
        self.enable_evaluation
    }
}

/// Unvalidated wire form of a [`Query`].
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    /// Question to ask.
    pub question: String,
    /// Include source passages in the response.
    #[serde(default = "default_true")]
    pub include_sources: bool,
    /// Score the answer for faithfulness and relevancy.
    #[serde(default)]
    pub enable_evaluation: bool,
}

fn default_true() -> bool {
    true
}

impl TryFrom<QueryRequest> for Query {
    type Error = QueryError;

    fn try_from(request: QueryRequest) -> Result<Self, Self::Error> {
        Query::new(request.question, request.include_sources, request.enable_evaluation)
    }
}

/// A retrieved excerpt that grounded the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePassage {
    /// Document content excerpt.
    pub content: String,
    /// Document metadata.
    pub metadata: HashMap<String, Value>,
}

impl From<SearchResult> for SourcePassage {
    fn from(result: SearchResult) -> Self {
        let SearchResult { chunk, score } = result;
        let mut metadata: HashMap<String, Value> =
            chunk.metadata.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
        metadata.insert("document_id".to_string(), Value::String(chunk.document_id));
        metadata.insert("chunk_id".to_string(), Value::String(chunk.id));
        metadata.insert("score".to_string(), Value::from(f64::from(score)));
        Self { content: chunk.text, metadata }
    }
}

/// Scores produced by an [`Evaluator`](crate::Evaluator).
///
/// A failed evaluation is still a value: both scores are `None` and `error`
/// explains why.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationScore {
    /// Factual consistency of the answer with its sources, in `[0, 1]`.
    pub faithfulness: Option<f64>,
    /// How well the answer addresses the question, in `[0, 1]`.
    pub answer_relevancy: Option<f64>,
    /// Time taken by the evaluator in milliseconds.
    pub evaluation_time_ms: Option<f64>,
    /// Error message if evaluation failed.
    pub error: Option<String>,
}

impl EvaluationScore {
    /// A failed evaluation that took `elapsed_ms`.
    pub fn failed(message: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            faithfulness: None,
            answer_relevancy: None,
            evaluation_time_ms: Some(elapsed_ms),
            error: Some(message.into()),
        }
    }

    /// Whether the evaluator reported an error.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// The answer to one [`Query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Original question.
    pub question: String,
    /// Generated answer.
    pub answer: String,
    /// Source passages used, present only when requested.
    pub sources: Option<Vec<SourcePassage>>,
    /// Query processing time in milliseconds, evaluation included.
    pub processing_time_ms: f64,
    /// Evaluation scores, present only when requested.
    pub evaluation: Option<EvaluationScore>,
}
