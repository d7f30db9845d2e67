//! Answer evaluation: faithfulness and answer relevancy.
//!
//! An [`Evaluator`] never fails the query it scores. Implementations report
//! problems through [`Evaluator::evaluate`]'s `Err`, and the provided
//! [`Evaluator::score`] folds them into [`EvaluationScore::error`].
//! [`score_with_timeout`] additionally bounds the call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::embedding::{EmbeddingProvider, cosine_similarity};
use crate::error::{RagError, Result};
use crate::query::{EvaluationScore, SourcePassage};

/// Raw scores computed by an evaluator, before range checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    /// Degree to which the answer is supported by the sources.
    pub faithfulness: f64,
    /// Degree to which the answer addresses the question.
    pub answer_relevancy: f64,
}

/// Scores a (question, answer, sources) triple.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Short evaluator name used in logs and errors.
    fn name(&self) -> &str;

    /// Compute raw scores. May fail.
    async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        sources: &[SourcePassage],
    ) -> Result<Scores>;

    /// Compute scores without ever failing.
    ///
    /// Times the evaluation on its own clock, clamps scores into `[0, 1]`,
    /// and turns errors and non-finite scores into a degraded
    /// [`EvaluationScore`].
    async fn score(
        &self,
        question: &str,
        answer: &str,
        sources: &[SourcePassage],
    ) -> EvaluationScore {
        let start = Instant::now();
        let outcome = self.evaluate(question, answer, sources).await;
        let elapsed_ms = elapsed_ms(start);

        match outcome.and_then(|scores| normalize(self.name(), scores)) {
            Ok(scores) => {
                debug!(
                    evaluator = self.name(),
                    faithfulness = scores.faithfulness,
                    answer_relevancy = scores.answer_relevancy,
                    elapsed_ms,
                    "evaluation completed"
                );
                EvaluationScore {
                    faithfulness: Some(scores.faithfulness),
                    answer_relevancy: Some(scores.answer_relevancy),
                    evaluation_time_ms: Some(elapsed_ms),
                    error: None,
                }
            }
            Err(e) => {
                warn!(evaluator = self.name(), error = %e, "evaluation degraded");
                EvaluationScore::failed(e.to_string(), elapsed_ms)
            }
        }
    }
}

/// Run [`Evaluator::score`] with an upper bound on its duration.
///
/// When the bound is hit the in-flight evaluation is dropped and a degraded
/// score is returned.
pub async fn score_with_timeout(
    evaluator: &dyn Evaluator,
    timeout: Duration,
    question: &str,
    answer: &str,
    sources: &[SourcePassage],
) -> EvaluationScore {
    let start = Instant::now();
    match tokio::time::timeout(timeout, evaluator.score(question, answer, sources)).await {
        Ok(score) => score,
        Err(_) => {
            let elapsed_ms = elapsed_ms(start);
            warn!(evaluator = evaluator.name(), timeout_ms = timeout.as_millis() as u64, "evaluation timed out");
            EvaluationScore::failed(
                format!("evaluation timed out after {} ms", timeout.as_millis()),
                elapsed_ms,
            )
        }
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn normalize(evaluator: &str, scores: Scores) -> Result<Scores> {
    if !scores.faithfulness.is_finite() || !scores.answer_relevancy.is_finite() {
        return Err(RagError::EvaluationError {
            evaluator: evaluator.to_string(),
            message: "evaluator produced a non-finite score".to_string(),
        });
    }
    Ok(Scores {
        faithfulness: scores.faithfulness.clamp(0.0, 1.0),
        answer_relevancy: scores.answer_relevancy.clamp(0.0, 1.0),
    })
}

/// Default similarity a sentence needs against some source to count as supported.
pub const DEFAULT_SUPPORT_THRESHOLD: f32 = 0.75;

/// An [`Evaluator`] built on embedding similarity.
///
/// - **Answer relevancy** is the cosine similarity between the question and
///   the answer, floored at zero.
/// - **Faithfulness** is the fraction of answer sentences whose best cosine
///   similarity against any source passage reaches the support threshold.
///   An answer with no sources scores zero.
///
/// All texts are embedded in a single batch call.
pub struct EmbeddingEvaluator {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    support_threshold: f32,
}

impl EmbeddingEvaluator {
    /// Create an evaluator using `embedding_provider`.
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedding_provider, support_threshold: DEFAULT_SUPPORT_THRESHOLD }
    }

    /// Set the similarity a sentence needs to count as supported.
    pub fn with_support_threshold(mut self, threshold: f32) -> Self {
        self.support_threshold = threshold;
        self
    }
}

/// Split text into trimmed, non-empty sentences.
fn split_sentences(text: &str) -> Vec<&str> {
    text.split_inclusive(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .collect()
}

#[async_trait]
impl Evaluator for EmbeddingEvaluator {
    fn name(&self) -> &str {
        "embedding"
    }

    async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        sources: &[SourcePassage],
    ) -> Result<Scores> {
        let sentences = split_sentences(answer);
        if sentences.is_empty() {
            return Err(RagError::EvaluationError {
                evaluator: self.name().to_string(),
                message: "answer has no content to evaluate".to_string(),
            });
        }

        let mut texts: Vec<&str> = Vec::with_capacity(2 + sentences.len() + sources.len());
        texts.push(question);
        texts.push(answer);
        texts.extend(&sentences);
        texts.extend(sources.iter().map(|s| s.content.as_str()));

        let embeddings = self.embedding_provider.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(RagError::EvaluationError {
                evaluator: self.name().to_string(),
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    embeddings.len()
                ),
            });
        }

        let (question_emb, rest) = embeddings.split_at(1);
        let (answer_emb, rest) = rest.split_at(1);
        let (sentence_embs, source_embs) = rest.split_at(sentences.len());

        let answer_relevancy =
            f64::from(cosine_similarity(&question_emb[0], &answer_emb[0]).max(0.0));

        let faithfulness = if source_embs.is_empty() {
            0.0
        } else {
            let supported = sentence_embs
                .iter()
                .filter(|sentence| {
                    source_embs
                        .iter()
                        .map(|source| cosine_similarity(sentence, source))
                        .fold(f32::NEG_INFINITY, f32::max)
                        >= self.support_threshold
                })
                .count();
            supported as f64 / sentence_embs.len() as f64
        };

        Ok(Scores { faithfulness, answer_relevancy })
    }
}
