use crate::error::{RagError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Embedding = Vec<f32>;
pub type Metadata = Map<String, Value>;

/// Contiguous window of source words, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: String,
    pub text: String,
    pub embedding: Embedding,
    pub metadata: Metadata,
}

/// Co-indexed columns submitted to a vector store in one request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryBatch {
    ids: Vec<String>,
    texts: Vec<String>,
    embeddings: Vec<Embedding>,
    metadatas: Vec<Metadata>,
}

impl EntryBatch {
    pub fn new(
        ids: Vec<String>,
        texts: Vec<String>,
        embeddings: Vec<Embedding>,
        metadatas: Vec<Metadata>,
    ) -> Result<Self> {
        let expected = ids.len();
        for (stage, actual) in [
            ("stored texts", texts.len()),
            ("stored embeddings", embeddings.len()),
            ("stored metadatas", metadatas.len()),
        ] {
            if actual != expected {
                return Err(RagError::CountMismatch {
                    stage,
                    expected,
                    actual,
                });
            }
        }

        Ok(Self {
            ids,
            texts,
            embeddings,
            metadatas,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    pub fn metadatas(&self) -> &[Metadata] {
        &self.metadatas
    }

    pub fn into_entries(self) -> Vec<StoredEntry> {
        self.ids
            .into_iter()
            .zip(self.texts)
            .zip(self.embeddings)
            .zip(self.metadatas)
            .map(|(((id, text), embedding), metadata)| StoredEntry {
                id,
                text,
                embedding,
                metadata,
            })
            .collect()
    }
}

/// Nearest neighbors of one query, nearest first.
///
/// Deserialization goes through [`NeighborResult::new`], so decoded values
/// hold the same guarantees as constructed ones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "NeighborColumns")]
pub struct NeighborResult {
    ranked_texts: Vec<String>,
    distances: Vec<f64>,
    metadatas: Vec<Metadata>,
}

impl NeighborResult {
    pub fn new(
        ranked_texts: Vec<String>,
        distances: Vec<f64>,
        metadatas: Vec<Metadata>,
    ) -> Result<Self> {
        let expected = ranked_texts.len();
        if distances.len() != expected {
            return Err(RagError::CountMismatch {
                stage: "neighbor distances",
                expected,
                actual: distances.len(),
            });
        }
        if metadatas.len() != expected {
            return Err(RagError::CountMismatch {
                stage: "neighbor metadatas",
                expected,
                actual: metadatas.len(),
            });
        }
        if distances.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(RagError::Validation(
                "neighbor distances are not in ascending order".to_string(),
            ));
        }

        Ok(Self {
            ranked_texts,
            distances,
            metadatas,
        })
    }

    pub fn len(&self) -> usize {
        self.ranked_texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked_texts.is_empty()
    }

    pub fn ranked_texts(&self) -> &[String] {
        &self.ranked_texts
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn metadatas(&self) -> &[Metadata] {
        &self.metadatas
    }
}

#[derive(Deserialize)]
struct NeighborColumns {
    ranked_texts: Vec<String>,
    distances: Vec<f64>,
    metadatas: Vec<Metadata>,
}

impl TryFrom<NeighborColumns> for NeighborResult {
    type Error = RagError;

    fn try_from(columns: NeighborColumns) -> Result<Self> {
        Self::new(columns.ranked_texts, columns.distances, columns.metadatas)
    }
}

/// How chunk ids are assigned during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdStrategy {
    /// SHA-256 of source id, ordinal and text; re-ingestion overwrites.
    #[default]
    ContentHash,
    /// Fresh UUID v4 per chunk; re-ingestion duplicates.
    Random,
}

impl IdStrategy {
    pub fn write_mode(self) -> WriteMode {
        match self {
            Self::ContentHash => WriteMode::Upsert,
            Self::Random => WriteMode::Append,
        }
    }
}

impl std::str::FromStr for IdStrategy {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "content-hash" | "content_hash" | "hash" => Ok(Self::ContentHash),
            "random" | "uuid" => Ok(Self::Random),
            other => Err(format!(
                "unknown id strategy `{other}` (expected `content-hash` or `random`)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    Append,
    Upsert,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub source_id: String,
    pub chunk_count: usize,
    pub ids: Vec<String>,
    pub write_mode: WriteMode,
    pub ingested_at: DateTime<Utc>,
}

impl IngestReport {
    pub fn message(&self) -> &'static str {
        "Document embedded and stored successfully"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub prompt: String,
    pub neighbors: NeighborResult,
}
