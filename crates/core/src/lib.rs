pub mod cancel;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod stores;
pub mod synthesizer;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use chunking::{content_chunk_id, split_into_chunks, ChunkingConfig};
pub use config::RagConfig;
pub use embeddings::OllamaEmbedder;
pub use error::{RagError, Result, Service};
pub use extractor::DocumentExtractor;
pub use ingest::{discover_documents, ingest_path, PathIngestReport, SkippedDocument};
pub use models::{
    Answer, Chunk, Embedding, EntryBatch, IdStrategy, IngestReport, Metadata, NeighborResult,
    StoredEntry, WriteMode,
};
pub use orchestrator::{build_prompt, PipelineSettings, RagOrchestrator, DEFAULT_SOURCE_ID};
pub use stores::{ChromaStore, InMemoryStore};
pub use synthesizer::{OllamaGenerator, NO_RESPONSE_FALLBACK};
pub use traits::{Embedder, Generator, TextExtractor, VectorStore};
