//! Behaviour of the query pipeline against in-process collaborators.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docqa_rag::{
    Chunk, CollectionInfo, EmbeddingEvaluator, EmbeddingProvider, Evaluator, Generator,
    InMemoryVectorStore, NO_CONTEXT_ANSWER, PipelineConfig, Query, QueryError, QueryPipeline,
    RagError, Result, Scores, SearchResult, SourcePassage, VectorStore,
};

const DIM: usize = 32;
const COLLECTION: &str = "documents";

/// Bag-of-words embedding over hashed buckets. Components are non-negative,
/// so every similarity lies in `[0, 1]`.
fn hash_embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(2166136261u32, |acc, b| (acc ^ u32::from(b)).wrapping_mul(16777619));
        v[hash as usize % DIM] += 1.0;
    }
    v
}

struct HashEmbedder {
    delay: Duration,
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(hash_embed(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Answers with a summary of the passages it was given.
#[derive(Default)]
struct EchoGenerator {
    delay: Duration,
    calls: AtomicUsize,
}

#[async_trait]
impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, question: &str, passages: &[SourcePassage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(format!("{question} -> {} passages; {}", passages.len(), passages[0].content))
    }
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _: &str, _: &[SourcePassage]) -> Result<String> {
        Err(RagError::GenerationError {
            provider: "failing".to_string(),
            message: "provider returned 500".to_string(),
        })
    }
}

struct UnreachableStore;

#[async_trait]
impl VectorStore for UnreachableStore {
    fn backend(&self) -> &str {
        "unreachable"
    }

    async fn create_collection(&self, _: &str, _: usize) -> Result<()> {
        Err(unreachable_error())
    }

    async fn delete_collection(&self, _: &str) -> Result<()> {
        Err(unreachable_error())
    }

    async fn upsert(&self, _: &str, _: &[Chunk]) -> Result<()> {
        Err(unreachable_error())
    }

    async fn delete(&self, _: &str, _: &[&str]) -> Result<()> {
        Err(unreachable_error())
    }

    async fn search(&self, _: &str, _: &[f32], _: usize) -> Result<Vec<SearchResult>> {
        Err(unreachable_error())
    }

    async fn collection_info(&self, _: &str) -> Result<CollectionInfo> {
        Err(unreachable_error())
    }
}

fn unreachable_error() -> RagError {
    RagError::VectorStoreError {
        backend: "unreachable".to_string(),
        message: "connection refused".to_string(),
    }
}

struct FailingEvaluator;

#[async_trait]
impl Evaluator for FailingEvaluator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn evaluate(&self, _: &str, _: &str, _: &[SourcePassage]) -> Result<Scores> {
        Err(RagError::EvaluationError {
            evaluator: "failing".to_string(),
            message: "judge model unavailable".to_string(),
        })
    }
}

struct SleepyEvaluator(Duration);

#[async_trait]
impl Evaluator for SleepyEvaluator {
    fn name(&self) -> &str {
        "sleepy"
    }

    async fn evaluate(&self, _: &str, _: &str, _: &[SourcePassage]) -> Result<Scores> {
        tokio::time::sleep(self.0).await;
        Ok(Scores { faithfulness: 0.8, answer_relevancy: 0.9 })
    }
}

fn chunk(id: &str, text: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        text: text.to_string(),
        embedding: hash_embed(text),
        metadata: HashMap::from([("source".to_string(), "rag.md".to_string())]),
        document_id: "rag-doc".to_string(),
    }
}

async fn seeded_store(texts: &[&str]) -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new());
    store.create_collection(COLLECTION, DIM).await.unwrap();
    let chunks: Vec<Chunk> =
        texts.iter().enumerate().map(|(i, text)| chunk(&format!("c{i}"), text)).collect();
    store.upsert(COLLECTION, &chunks).await.unwrap();
    store
}

const RAG_CHUNKS: [&str; 4] = [
    "RAG is retrieval augmented generation.",
    "RAG retrieves passages before generation.",
    "What RAG does is ground answers in documents.",
    "Is RAG useful? It reduces hallucination.",
];

struct Setup {
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    evaluator: Option<Arc<dyn Evaluator>>,
    embed_delay: Duration,
    config: PipelineConfig,
}

impl Setup {
    fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            generator: Arc::new(EchoGenerator::default()),
            evaluator: None,
            embed_delay: Duration::ZERO,
            config: PipelineConfig::default(),
        }
    }

    fn build(self) -> QueryPipeline {
        let mut builder = QueryPipeline::builder()
            .config(self.config)
            .embedding_provider(Arc::new(HashEmbedder { delay: self.embed_delay }))
            .vector_store(self.store)
            .collection(COLLECTION)
            .generator(self.generator);
        if let Some(evaluator) = self.evaluator {
            builder = builder.evaluator(evaluator);
        }
        builder.build().unwrap()
    }
}

#[tokio::test]
async fn what_is_rag_returns_four_sources_without_evaluation() {
    let pipeline = Setup::new(seeded_store(&RAG_CHUNKS).await).build();
    let query = Query::new("What is RAG?", true, false).unwrap();

    let result = pipeline.answer(&query).await.unwrap();

    assert_eq!(result.question, "What is RAG?");
    assert!(!result.answer.is_empty());
    assert_eq!(result.sources.as_ref().map(Vec::len), Some(4));
    assert!(result.evaluation.is_none());
    assert!(result.processing_time_ms >= 0.0);
}

#[tokio::test]
async fn sources_are_ranked_and_carry_metadata() {
    let pipeline = Setup::new(seeded_store(&RAG_CHUNKS).await).build();
    let query = Query::new("What is RAG?", true, false).unwrap();

    let sources = pipeline.answer(&query).await.unwrap().sources.unwrap();
    let scores: Vec<f64> =
        sources.iter().map(|s| s.metadata["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "scores not descending: {scores:?}");
    assert_eq!(sources[0].metadata["document_id"], "rag-doc");
    assert_eq!(sources[0].metadata["source"], "rag.md");
}

#[tokio::test]
async fn sources_never_exceed_top_k() {
    let mut texts = RAG_CHUNKS.to_vec();
    texts.extend(["RAG pipelines embed queries.", "RAG uses vector search."]);
    let mut setup = Setup::new(seeded_store(&texts).await);
    setup.config = PipelineConfig::builder().top_k(3).build().unwrap();
    let pipeline = setup.build();

    let result = pipeline.answer(&Query::new("What is RAG?", true, false).unwrap()).await.unwrap();
    assert_eq!(result.sources.unwrap().len(), 3);
}

#[tokio::test]
async fn include_sources_false_omits_sources() {
    let pipeline = Setup::new(seeded_store(&RAG_CHUNKS).await).build();
    let result =
        pipeline.answer(&Query::new("What is RAG?", false, false).unwrap()).await.unwrap();
    assert!(result.sources.is_none());
    assert!(!result.answer.is_empty());
}

#[tokio::test]
async fn empty_index_answers_without_context() {
    let generator = Arc::new(EchoGenerator::default());
    let mut setup = Setup::new(seeded_store(&[]).await);
    setup.generator = generator.clone();
    let pipeline = setup.build();

    let result = pipeline.answer(&Query::new("What is RAG?", true, false).unwrap()).await.unwrap();

    assert_eq!(result.answer, NO_CONTEXT_ANSWER);
    assert_eq!(result.sources, Some(Vec::new()));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_index_fails_with_retrieval_failed() {
    let pipeline = Setup::new(Arc::new(UnreachableStore)).build();
    let err = pipeline.answer(&Query::new("What is RAG?", true, true).unwrap()).await.unwrap_err();
    assert!(matches!(err, QueryError::RetrievalFailed(_)), "got {err:?}");
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn generator_error_fails_with_generation_failed() {
    let mut setup = Setup::new(seeded_store(&RAG_CHUNKS).await);
    setup.generator = Arc::new(FailingGenerator);
    let pipeline = setup.build();

    let err = pipeline.answer(&Query::new("What is RAG?", true, false).unwrap()).await.unwrap_err();
    assert!(matches!(err, QueryError::GenerationFailed(_)));
    assert_eq!(err.kind(), "GenerationFailed");
}

#[tokio::test(start_paused = true)]
async fn generation_timeout_fails_with_generation_failed() {
    let mut setup = Setup::new(seeded_store(&RAG_CHUNKS).await);
    setup.generator =
        Arc::new(EchoGenerator { delay: Duration::from_secs(600), ..Default::default() });
    setup.config = PipelineConfig::builder()
        .generation_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let pipeline = setup.build();

    let err = pipeline.answer(&Query::new("What is RAG?", true, false).unwrap()).await.unwrap_err();
    match err {
        QueryError::GenerationFailed(message) => assert!(message.contains("timed out")),
        other => panic!("expected GenerationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn evaluation_disabled_ignores_broken_evaluator() {
    let mut setup = Setup::new(seeded_store(&RAG_CHUNKS).await);
    setup.evaluator = Some(Arc::new(FailingEvaluator));
    let pipeline = setup.build();

    let result = pipeline.answer(&Query::new("What is RAG?", true, false).unwrap()).await.unwrap();
    assert!(result.evaluation.is_none());
}

#[tokio::test]
async fn failing_evaluator_degrades_but_query_succeeds() {
    let mut setup = Setup::new(seeded_store(&RAG_CHUNKS).await);
    setup.evaluator = Some(Arc::new(FailingEvaluator));
    let pipeline = setup.build();

    let result = pipeline.answer(&Query::new("What is RAG?", true, true).unwrap()).await.unwrap();
    let evaluation = result.evaluation.expect("evaluation present when enabled");
    assert!(evaluation.faithfulness.is_none());
    assert!(evaluation.answer_relevancy.is_none());
    assert!(evaluation.error.unwrap().contains("judge model unavailable"));
}

#[tokio::test]
async fn missing_evaluator_still_reports_evaluation() {
    let pipeline = Setup::new(seeded_store(&RAG_CHUNKS).await).build();
    let result = pipeline.answer(&Query::new("What is RAG?", true, true).unwrap()).await.unwrap();
    assert!(result.evaluation.unwrap().is_degraded());
}

#[tokio::test(start_paused = true)]
async fn slow_evaluator_is_cut_off_by_its_timeout() {
    let mut setup = Setup::new(seeded_store(&RAG_CHUNKS).await);
    setup.evaluator = Some(Arc::new(SleepyEvaluator(Duration::from_secs(300))));
    setup.config = PipelineConfig::builder()
        .evaluation_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let pipeline = setup.build();

    let result = pipeline.answer(&Query::new("What is RAG?", true, true).unwrap()).await.unwrap();
    let evaluation = result.evaluation.unwrap();
    assert!(evaluation.error.unwrap().contains("timed out"));
    assert!(result.processing_time_ms >= 2000.0);
    assert!(result.processing_time_ms < 300_000.0);
}

#[tokio::test(start_paused = true)]
async fn slow_generation_and_evaluation_still_answer_within_request_budget() {
    let config = PipelineConfig::builder()
        .generation_timeout(Duration::from_secs(20))
        .evaluation_timeout(Duration::from_secs(9))
        .request_timeout(Duration::from_secs(30))
        .build()
        .unwrap();
    let request_timeout = config.request_timeout;

    let mut setup = Setup::new(seeded_store(&RAG_CHUNKS).await);
    setup.generator =
        Arc::new(EchoGenerator { delay: Duration::from_secs(19), ..Default::default() });
    setup.evaluator = Some(Arc::new(SleepyEvaluator(Duration::from_secs(3600))));
    setup.config = config;
    let pipeline = setup.build();

    let query = Query::new("What is RAG?", true, true).unwrap();
    let result = tokio::time::timeout(request_timeout, pipeline.answer(&query))
        .await
        .expect("pipeline finishes inside the request budget")
        .unwrap();
    assert!(result.evaluation.unwrap().error.unwrap().contains("timed out"));
    assert!(result.processing_time_ms < 30_000.0);
}

#[tokio::test]
async fn embedding_evaluator_scores_stay_in_unit_interval() {
    let mut setup = Setup::new(seeded_store(&RAG_CHUNKS).await);
    setup.evaluator =
        Some(Arc::new(EmbeddingEvaluator::new(Arc::new(HashEmbedder { delay: Duration::ZERO }))));
    let pipeline = setup.build();

    let result = pipeline.answer(&Query::new("What is RAG?", true, true).unwrap()).await.unwrap();
    let evaluation = result.evaluation.unwrap();
    assert!(evaluation.error.is_none(), "unexpected error: {:?}", evaluation.error);
    for score in [evaluation.faithfulness.unwrap(), evaluation.answer_relevancy.unwrap()] {
        assert!((0.0..=1.0).contains(&score), "score out of range: {score}");
    }
}

#[tokio::test(start_paused = true)]
async fn processing_time_covers_retrieval_generation_and_evaluation() {
    let mut setup = Setup::new(seeded_store(&RAG_CHUNKS).await);
    setup.embed_delay = Duration::from_millis(100);
    setup.generator =
        Arc::new(EchoGenerator { delay: Duration::from_millis(200), ..Default::default() });
    setup.evaluator = Some(Arc::new(SleepyEvaluator(Duration::from_millis(50))));
    let pipeline = setup.build();

    let without_eval =
        pipeline.answer(&Query::new("What is RAG?", true, false).unwrap()).await.unwrap();
    assert!(without_eval.processing_time_ms >= 300.0, "{}", without_eval.processing_time_ms);
    assert!(without_eval.processing_time_ms < 350.0, "{}", without_eval.processing_time_ms);

    let with_eval =
        pipeline.answer(&Query::new("What is RAG?", true, true).unwrap()).await.unwrap();
    let evaluation_ms = with_eval.evaluation.as_ref().unwrap().evaluation_time_ms.unwrap();
    assert!(evaluation_ms >= 50.0);
    assert!(with_eval.processing_time_ms >= 350.0, "{}", with_eval.processing_time_ms);
    assert!(with_eval.processing_time_ms >= evaluation_ms);
}

#[tokio::test]
async fn concurrent_queries_are_independent() {
    let pipeline = Arc::new(Setup::new(seeded_store(&RAG_CHUNKS).await).build());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                let query = Query::new(format!("What is RAG? #{i}"), i % 2 == 0, false).unwrap();
                pipeline.answer(&query).await
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.question, format!("What is RAG? #{i}"));
        assert_eq!(result.sources.is_some(), i % 2 == 0);
    }
}
