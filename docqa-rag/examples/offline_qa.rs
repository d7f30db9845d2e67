//! # Offline question answering
//!
//! Ingests a few documents into an `InMemoryVectorStore`, then asks questions
//! through the `QueryPipeline` with evaluation enabled.
//!
//! Embeddings come from a deterministic bag-of-words provider and answers
//! from a generator that quotes the best passage, so this runs with **zero
//! API keys**.
//!
//! Run: `cargo run -p docqa-rag --example offline_qa`

use std::collections::HashMap;
use std::sync::Arc;

use docqa_rag::{
    ChunkingConfig, Document, EmbeddingEvaluator, EmbeddingProvider, Generator,
    InMemoryVectorStore, Ingestor, PipelineConfig, Query, QueryPipeline, SourcePassage,
    VectorStore,
};

/// Hashes each word into one of `dimensions` buckets.
struct BagOfWordsEmbedder {
    dimensions: usize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        let mut emb = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| w.len() > 2) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Answers by quoting the highest-ranked passage.
struct QuotingGenerator;

#[async_trait::async_trait]
impl Generator for QuotingGenerator {
    fn name(&self) -> &str {
        "quoting"
    }

    async fn generate(&self, _question: &str, passages: &[SourcePassage]) -> docqa_rag::Result<String> {
        Ok(passages.first().map(|p| p.content.clone()).unwrap_or_default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let collection = "knowledge_base";
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(BagOfWordsEmbedder { dimensions: 64 });
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());

    let ingestor = Ingestor::new(
        Arc::clone(&embedder),
        Arc::clone(&store),
        collection,
        ChunkingConfig::new(200, 40)?,
    );
    ingestor.ensure_collection().await?;

    let documents = [
        (
            "rust.txt",
            "Rust is a systems programming language focused on safety, speed, and \
             concurrency. It achieves memory safety without a garbage collector through \
             its ownership system.",
        ),
        (
            "python.txt",
            "Python is a high-level, interpreted programming language known for its \
             readability. It is widely used in data science and automation.",
        ),
        (
            "rag.md",
            "# RAG\n\nRetrieval-Augmented Generation combines a retrieval system with a \
             language model. Documents are chunked, embedded, and stored in a vector \
             database.\n\n## Query time\n\nThe most relevant chunks are retrieved and \
             given to the model as context.",
        ),
    ];

    println!("Ingesting {} documents...", documents.len());
    for (name, text) in documents {
        let document = Document {
            id: name.to_string(),
            text: text.to_string(),
            metadata: HashMap::from([("source".to_string(), name.to_string())]),
        };
        let chunks = ingestor.ingest(&document).await?;
        println!("  {name} → {} chunk(s)", chunks.len());
    }

    let pipeline = QueryPipeline::builder()
        .config(PipelineConfig::builder().top_k(2).build()?)
        .embedding_provider(Arc::clone(&embedder))
        .vector_store(store)
        .collection(collection)
        .generator(Arc::new(QuotingGenerator))
        .evaluator(Arc::new(EmbeddingEvaluator::new(embedder)))
        .build()?;

    let questions = [
        "How does Rust achieve memory safety?",
        "Which language is used in data science?",
        "What happens at query time in retrieval-augmented generation?",
    ];

    for question in questions {
        let result = pipeline.answer(&Query::new(question, true, true)?).await?;
        println!("\nQ: {question}");
        println!("A: {}", result.answer);
        for source in result.sources.unwrap_or_default() {
            println!("   - {} (score {})", source.metadata["source"], source.metadata["score"]);
        }
        if let Some(evaluation) = result.evaluation {
            println!(
                "   faithfulness={:?} relevancy={:?} ({:.1} ms total)",
                evaluation.faithfulness, evaluation.answer_relevancy, result.processing_time_ms
            );
        }
    }

    Ok(())
}
