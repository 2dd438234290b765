#[cfg(test)]
mod tests;

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::future::Future;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::chunker::TextChunk;
use crate::config::Config;

/// A persistence-boundary fault. Every lower-level error is converted
/// into this type at the store boundary; callers must treat it as
/// "store unavailable", which is distinct from a store that returns
/// zero rows.
#[derive(Debug, Error)]
#[error("Database error while {operation}: {source}")]
pub struct DatabaseError {
    operation: String,
    #[source]
    source: sqlx::Error,
}

impl DatabaseError {
    #[inline]
    pub fn new(operation: impl Into<String>, source: sqlx::Error) -> Self {
        Self {
            operation: operation.into(),
            source,
        }
    }
}

/// A stored chunk row: provenance offsets, the chunk text (the exact-match
/// de-duplication key) and its embedding. Append-only once inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextChunk {
    pub chunk_id: i32,
    pub start_word: i32,
    pub end_word: i32,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl ContextChunk {
    #[inline]
    pub fn from_chunk(chunk: &TextChunk, embedding: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk.chunk_id,
            start_word: chunk.start_word,
            end_word: chunk.end_word,
            text: chunk.text.clone(),
            embedding,
        }
    }
}

/// One retrieval hit, ordered ascending by vector distance.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalCandidate {
    pub context_text: String,
    pub distance: f64,
}

/// Seam between the persistence layer and its callers; test doubles
/// substitute for the real store behind this trait.
#[async_trait]
pub trait ContextStore {
    async fn ensure_schema(&self) -> Result<(), DatabaseError>;
    async fn exists(&self, text: &str) -> Result<bool, DatabaseError>;
    async fn insert(&self, chunk: &ContextChunk) -> Result<(), DatabaseError>;
    async fn nearest(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<RetrievalCandidate>, DatabaseError>;
}

const EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM qa_embeddings WHERE context = $1)";

const INSERT_SQL: &str = "INSERT INTO qa_embeddings \
    (chunk_id, start_word, end_word, context, embedding) \
    VALUES ($1, $2, $3, $4, $5) \
    ON CONFLICT (context) DO NOTHING";

const NEAREST_SQL: &str = "SELECT context, embedding <=> $1 AS distance \
    FROM qa_embeddings ORDER BY distance LIMIT $2";

const CREATE_INDEX_SQL: &str = "CREATE INDEX IF NOT EXISTS qa_embeddings_embedding_idx \
    ON qa_embeddings USING ivfflat (embedding)";

fn create_table_sql(dimension: usize) -> String {
    // The UNIQUE constraint on context backstops the non-atomic
    // check-then-insert done by ingestion; concurrent duplicate inserts
    // collapse into one row instead of racing.
    format!(
        "CREATE TABLE IF NOT EXISTS qa_embeddings (\
            id BIGSERIAL PRIMARY KEY, \
            chunk_id INTEGER NOT NULL, \
            start_word INTEGER NOT NULL, \
            end_word INTEGER NOT NULL, \
            context TEXT NOT NULL UNIQUE, \
            embedding vector({dimension}) NOT NULL)"
    )
}

/// Returns true when a statement failed because the `vector` type was
/// not known on the connection that ran it, either because the extension
/// is missing server-side or because the type could not be resolved for
/// a bound parameter. This is the one fault the store heals itself from.
fn is_missing_vector_type(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::TypeNotFound { type_name } => type_name == "vector",
        sqlx::Error::Database(db_err) => {
            db_err.message().contains("type \"vector\" does not exist")
        }
        _ => false,
    }
}

/// Run a statement, healing the missing-vector-type fault at most once:
/// `heal` registers the extension, then the statement is retried a single
/// time. Any other fault, or a fault on the retry, surfaces as
/// `DatabaseError`.
async fn heal_and_retry<T, A, AF, H, HF>(
    operation: &str,
    attempt: A,
    heal: H,
) -> Result<T, DatabaseError>
where
    A: Fn() -> AF,
    AF: Future<Output = Result<T, sqlx::Error>>,
    H: FnOnce() -> HF,
    HF: Future<Output = Result<(), DatabaseError>>,
{
    match attempt().await {
        Ok(value) => Ok(value),
        Err(err) => {
            if !is_missing_vector_type(&err) {
                return Err(DatabaseError::new(operation, err));
            }
            debug!("Vector type not registered on connection, healing and retrying");
            heal().await?;
            attempt()
                .await
                .map_err(|err| DatabaseError::new(operation, err))
        }
    }
}

/// Postgres-backed chunk store using pgvector for similarity search.
///
/// Owns the schema lifecycle: the first operation after startup runs
/// `ensure_schema`, which is idempotent and guarded so concurrent first
/// queries initialize it once.
#[derive(Debug)]
pub struct VectorStore {
    pool: PgPool,
    dimension: usize,
    schema_ready: Mutex<bool>,
}

impl VectorStore {
    /// Create a store over a lazy connection pool. Connection faults
    /// surface on first use as `DatabaseError`, not here.
    #[inline]
    pub fn connect(config: &Config) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(config.database.connect_options());

        Self {
            pool,
            dimension: config.embedding.dimension,
            schema_ready: Mutex::new(false),
        }
    }

    async fn register_vector_extension(&self) -> Result<(), DatabaseError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|err| DatabaseError::new("registering the vector extension", err))?;
        Ok(())
    }

    async fn try_exists(&self, text: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(EXISTS_SQL)
            .bind(text)
            .fetch_one(&self.pool)
            .await
    }

    async fn try_insert(&self, chunk: &ContextChunk) -> Result<(), sqlx::Error> {
        sqlx::query(INSERT_SQL)
            .bind(chunk.chunk_id)
            .bind(chunk.start_word)
            .bind(chunk.end_word)
            .bind(&chunk.text)
            .bind(Vector::from(chunk.embedding.clone()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn try_nearest(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<RetrievalCandidate>, sqlx::Error> {
        let rows = sqlx::query(NEAREST_SQL)
            .bind(Vector::from(embedding.to_vec()))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(RetrievalCandidate {
                    context_text: row.try_get("context")?,
                    distance: row.try_get("distance")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ContextStore for VectorStore {
    /// Idempotent creation of the extension, table and similarity index.
    /// Safe under concurrent callers: the flag is mutex-guarded, and a
    /// benign double initialization is harmless because every statement
    /// is `IF NOT EXISTS`.
    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        let mut ready = self.schema_ready.lock().await;
        if *ready {
            return Ok(());
        }

        info!("Initializing qa_embeddings schema");
        self.register_vector_extension().await?;
        sqlx::query(&create_table_sql(self.dimension))
            .execute(&self.pool)
            .await
            .map_err(|err| DatabaseError::new("creating the qa_embeddings table", err))?;
        sqlx::query(CREATE_INDEX_SQL)
            .execute(&self.pool)
            .await
            .map_err(|err| DatabaseError::new("creating the embedding index", err))?;

        *ready = true;
        debug!("Schema initialization complete");
        Ok(())
    }

    /// Exact-match existence check on the chunk text, no normalization.
    /// The de-duplication gate callers must pass before every insert.
    async fn exists(&self, text: &str) -> Result<bool, DatabaseError> {
        self.ensure_schema().await?;
        heal_and_retry(
            "checking for existing context",
            || self.try_exists(text),
            || self.register_vector_extension(),
        )
        .await
    }

    async fn insert(&self, chunk: &ContextChunk) -> Result<(), DatabaseError> {
        self.ensure_schema().await?;
        heal_and_retry(
            "inserting a context chunk",
            || self.try_insert(chunk),
            || self.register_vector_extension(),
        )
        .await
    }

    /// Nearest-neighbor lookup, ascending by `<=>` distance.
    async fn nearest(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<RetrievalCandidate>, DatabaseError> {
        self.ensure_schema().await?;
        let candidates = heal_and_retry(
            "querying nearest contexts",
            || self.try_nearest(embedding, limit),
            || self.register_vector_extension(),
        )
        .await?;

        debug!("Retrieved {} candidate contexts", candidates.len());
        Ok(candidates)
    }
}
