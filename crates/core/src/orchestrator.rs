use crate::cancel::CancelSignal;
use crate::chunking::{content_chunk_id, split_into_chunks, ChunkingConfig};
use crate::config::{RagConfig, DEFAULT_TOP_K};
use crate::embeddings::check_batch;
use crate::error::{RagError, Result};
use crate::models::{Answer, Chunk, EntryBatch, IdStrategy, IngestReport, Metadata};
use crate::traits::{Embedder, Generator, VectorStore};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

/// Source id used when text is ingested without one.
pub const DEFAULT_SOURCE_ID: &str = "inline";

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub id_strategy: IdStrategy,
    pub embedding_dimensions: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            top_k: DEFAULT_TOP_K,
            id_strategy: IdStrategy::default(),
            embedding_dimensions: None,
        }
    }
}

impl From<&RagConfig> for PipelineSettings {
    fn from(config: &RagConfig) -> Self {
        Self {
            chunking: config.chunking,
            top_k: config.top_k,
            id_strategy: config.id_strategy,
            embedding_dimensions: config.embedding_dimensions,
        }
    }
}

/// Runs the ingest and answer flows over an embedder, a store and a generator.
///
/// Holds no per-request state, so one instance can serve concurrent calls.
pub struct RagOrchestrator<E, S, G>
where
    E: Embedder,
    S: VectorStore,
    G: Generator,
{
    embedder: E,
    store: S,
    generator: G,
    settings: PipelineSettings,
}

impl<E, S, G> RagOrchestrator<E, S, G>
where
    E: Embedder,
    S: VectorStore,
    G: Generator,
{
    pub fn new(embedder: E, store: S, generator: G, settings: PipelineSettings) -> Self {
        Self {
            embedder,
            store,
            generator,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn ingest(&self, source_text: &str) -> Result<IngestReport> {
        self.ingest_document(DEFAULT_SOURCE_ID, source_text).await
    }

    /// Chunks, embeds and stores `text`. Every failure propagates unchanged.
    pub async fn ingest_document(&self, source_id: &str, text: &str) -> Result<IngestReport> {
        let chunks = split_into_chunks(text, self.settings.chunking)?;
        let write_mode = self.settings.id_strategy.write_mode();

        if chunks.is_empty() {
            info!(source_id, "source text has no words; nothing to store");
            return Ok(IngestReport {
                source_id: source_id.to_string(),
                chunk_count: 0,
                ids: Vec::new(),
                write_mode,
                ingested_at: Utc::now(),
            });
        }

        let ids = chunks
            .iter()
            .map(|chunk| self.chunk_id(source_id, chunk))
            .collect::<Vec<_>>();
        let texts = chunks.into_iter().map(|chunk| chunk.text).collect::<Vec<_>>();

        let embeddings = self.embedder.embed_batch(&texts).await?;
        info!(
            source_id,
            chunks = texts.len(),
            embeddings = embeddings.len(),
            "embedded source chunks"
        );
        check_batch(texts.len(), &embeddings)?;
        if let Some(first) = embeddings.first() {
            self.check_dimensions(first.len())?;
        }

        let metadatas = vec![Metadata::new(); texts.len()];
        let batch = EntryBatch::new(ids.clone(), texts, embeddings, metadatas)?;
        self.store.store(&batch, write_mode).await?;

        Ok(IngestReport {
            source_id: source_id.to_string(),
            chunk_count: ids.len(),
            ids,
            write_mode,
            ingested_at: Utc::now(),
        })
    }

    /// Retrieves the nearest chunks for `query` and asks the generator.
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(RagError::Validation("query is empty".to_string()));
        }

        let query_embedding = self.embedder.embed_one(query).await?;
        self.check_dimensions(query_embedding.len())?;

        let neighbors = self
            .store
            .query(&query_embedding, self.settings.top_k)
            .await?;
        if neighbors.is_empty() {
            return Err(RagError::EmptyRetrieval);
        }

        let prompt = build_prompt(neighbors.ranked_texts(), query);
        debug!(prompt = %prompt, neighbors = neighbors.len(), "assembled prompt");

        let text = self.generator.generate(&prompt).await?;
        Ok(Answer {
            text,
            prompt,
            neighbors,
        })
    }

    pub async fn ingest_cancellable(
        &self,
        source_id: &str,
        text: &str,
        signal: &CancelSignal,
    ) -> Result<IngestReport> {
        signal.run(self.ingest_document(source_id, text)).await
    }

    pub async fn answer_cancellable(&self, query: &str, signal: &CancelSignal) -> Result<Answer> {
        signal.run(self.answer(query)).await
    }

    fn chunk_id(&self, source_id: &str, chunk: &Chunk) -> String {
        match self.settings.id_strategy {
            IdStrategy::ContentHash => content_chunk_id(source_id, chunk),
            IdStrategy::Random => Uuid::new_v4().to_string(),
        }
    }

    fn check_dimensions(&self, actual: usize) -> Result<()> {
        match self.settings.embedding_dimensions {
            Some(expected) if expected != actual => {
                Err(RagError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

pub fn build_prompt(context_texts: &[String], query: &str) -> String {
    format!(
        "Context: {}\nQuestion: {query}\nAnswer:",
        context_texts.join("\n")
    )
}
