use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::engine::RetrievalAnswerEngine;
use crate::ingest::ingest_text;
use crate::providers::ollama::OllamaClient;
use crate::store::{ContextStore, VectorStore};

/// Print the resolved configuration with credentials masked
#[inline]
pub fn show_config() -> Result<()> {
    let mut config = Config::load()?;
    if !config.database.password.is_empty() {
        config.database.password = "********".to_string();
    }

    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

/// Ingest one already-cleaned text file into the context store
#[inline]
pub async fn ingest_file(path: &Path) -> Result<()> {
    let config = Config::load()?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let client = OllamaClient::new(&config)?;
    client.health_check().context("Ollama is not reachable")?;

    let store = VectorStore::connect(&config);
    store.ensure_schema().await?;

    info!("Ingesting {}", path.display());
    let report = ingest_text(
        &store,
        &client,
        &text,
        config.embedding.chunk_size,
        config.embedding.overlap,
    )
    .await?;

    println!(
        "Ingested {}: {} chunks stored, {} duplicates skipped",
        path.display(),
        report.stored(),
        report.duplicates()
    );
    Ok(())
}

/// Answer a question against the stored contexts, or against an inline
/// context when one is supplied
#[inline]
pub async fn ask(question: &str, provided_context: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let client = OllamaClient::new(&config)?;
    let store = VectorStore::connect(&config);

    let engine = RetrievalAnswerEngine::new(&store, &client, &client, &config);
    let records = engine.answer(question, provided_context).await?;

    for record in records {
        println!("Question: {}", record.question);
        println!("Answer: {}", record.answer_text);
        if !record.context.is_empty() {
            println!("Context: {}", record.context);
        }
        println!("{}", "-".repeat(50));
    }
    Ok(())
}
