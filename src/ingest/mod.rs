
use tracing::{debug, info};

use crate::chunker::chunk_words;
use crate::providers::EmbeddingProvider;
use crate::store::{ContextChunk, ContextStore};
use crate::{QueryAiError, Result};

/// What happened to one chunk during ingestion. Callers map these to
/// their own response statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    Stored,
    Duplicate,
}

/// Per-chunk outcomes for one ingested text, in chunk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub outcomes: Vec<ChunkOutcome>,
}

impl IngestReport {
    #[inline]
    pub fn stored(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| **o == ChunkOutcome::Stored)
            .count()
    }

    #[inline]
    pub fn duplicates(&self) -> usize {
        self.outcomes.len() - self.stored()
    }
}

/// Ingest one already-cleaned text: chunk it into overlapping word
/// windows, embed each chunk, and persist the chunks that are not
/// already stored.
///
/// Idempotent: the exact chunk text is the de-duplication key, so
/// re-ingesting identical text stores nothing new. The existence check
/// and insert are not atomic; the store's unique constraint backstops
/// concurrent duplicate inserts.
#[inline]
pub async fn ingest_text<S, E>(
    store: &S,
    embedder: &E,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<IngestReport>
where
    S: ContextStore + Sync,
    E: EmbeddingProvider + Sync,
{
    store.ensure_schema().await?;

    let chunks = chunk_words(text, chunk_size, overlap)?;
    debug!("Ingesting {} chunks", chunks.len());

    let mut report = IngestReport::default();
    for chunk in &chunks {
        if store.exists(&chunk.text).await? {
            debug!("Skipping duplicate chunk {}", chunk.chunk_id);
            report.outcomes.push(ChunkOutcome::Duplicate);
            continue;
        }

        let embedding = embedder
            .embed(&chunk.text)
            .map_err(|err| QueryAiError::Embedding(err.to_string()))?;
        store
            .insert(&ContextChunk::from_chunk(chunk, embedding))
            .await?;
        report.outcomes.push(ChunkOutcome::Stored);
    }

    info!(
        "Ingestion complete: {} stored, {} duplicates",
        report.stored(),
        report.duplicates()
    );
    Ok(report)
}
