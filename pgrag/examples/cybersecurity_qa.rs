//! # Cybersecurity Q&A
//!
//! Ingests five short cybersecurity notes into PostgreSQL + pgvector, then
//! answers a question from the closest note with an OpenAI chat model.
//!
//! Requires: `DATABASE_URL` (PostgreSQL with the `vector` extension available)
//! and `OPENAI_API_KEY`. Both may be set in a `.env` file.
//!
//! Run: `cargo run -p pgrag --example cybersecurity_qa --features full`

use std::sync::Arc;

use pgrag::{
    Embedder, Metadata, MetadataFilter, OpenAIEmbedder, OpenAIGenerator, PgVectorConfig,
    PgVectorStore, QueryOptions, RagConfig, RagPipeline, VectorStore,
};
use serde_json::json;

const NOTES: [(i64, &str); 5] = [
    (
        1,
        "Cybersecurity is the practice of protecting systems and networks from attacks. \
         It includes measures like firewalls, intrusion detection, and encryption.",
    ),
    (
        2,
        "A zero-day vulnerability is an undisclosed flaw in software that attackers can \
         exploit before the vendor issues a fix.",
    ),
    (
        3,
        "Two-factor authentication (2FA) enhances security by requiring users to provide \
         two forms of verification before gaining access.",
    ),
    (
        4,
        "Machine learning models require large datasets and are often fine-tuned to improve \
         accuracy for specific tasks.",
    ),
    (
        5,
        "The CIA triad (Confidentiality, Integrity, and Availability) is a foundational \
         concept in cybersecurity.",
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pgrag=info".into()),
        )
        .init();

    // -- 1. Connect the collaborators -------------------------------------
    let embedder = Arc::new(OpenAIEmbedder::from_env()?);
    let generator = Arc::new(OpenAIGenerator::from_env()?);

    let database_url = std::env::var("DATABASE_URL")?;
    let store_config = PgVectorConfig::new(database_url, embedder.dimensions())
        .with_table_name("cybersecurity_notes")
        .with_create_extension(true);
    let store = Arc::new(PgVectorStore::connect(store_config).await?);

    // -- 2. Build and initialize the pipeline ------------------------------
    let pipeline = RagPipeline::builder()
        .config(RagConfig::builder().batch_size(16).build()?)
        .embedder(embedder)
        .vector_store(store)
        .generator(generator)
        .build()?;
    pipeline.initialize().await?;

    // -- 3. Ingest, replacing any earlier run ------------------------------
    for (document_id, text) in NOTES {
        let filter = MetadataFilter::new().with("document_id", document_id);
        pipeline.vector_store().delete_by_metadata_filter(&filter).await?;

        let mut metadata = Metadata::new();
        metadata.insert("document_id".into(), json!(document_id));
        let outcome = pipeline.add_document(text, Some(metadata), None).await?;
        println!(
            "note {document_id} → {} chunk(s) in {}",
            outcome.chunks.len(),
            outcome.collection_id
        );
    }

    // -- 4. Ask ----------------------------------------------------------
    let question = "What is 2FA?";
    let trace = pipeline.query_with_trace(question, &QueryOptions::new().top_k(1)).await?;

    println!("\nQuestion: {question}");
    for result in &trace.retrieved {
        println!("  [distance={:.4}] {}", result.distance, result.chunk.content);
    }
    println!("\nAnswer: {}", trace.answer);

    pipeline.close().await?;
    Ok(())
}
