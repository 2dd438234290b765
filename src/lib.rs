use thiserror::Error;

use crate::chunker::ChunkError;
use crate::store::DatabaseError;

pub type Result<T> = std::result::Result<T, QueryAiError>;

#[derive(Error, Debug)]
pub enum QueryAiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkError),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunker;
pub mod commands;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod providers;
pub mod store;
