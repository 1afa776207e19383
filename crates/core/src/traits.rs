use crate::error::Result;
use crate::models::{Embedding, EntryBatch, NeighborResult, WriteMode};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_one(&self, text: &str) -> Result<Embedding>;

    /// Output is index-aligned with `texts`; any failure fails the batch.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn store(&self, batch: &EntryBatch, mode: WriteMode) -> Result<()>;

    async fn query(&self, embedding: &[f32], k: usize) -> Result<NeighborResult>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub trait TextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String>;
}
