use crate::error::{RagError, Result};
use crate::models::{EntryBatch, NeighborResult, StoredEntry, WriteMode};
use crate::traits::VectorStore;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Process-local store ranking by squared Euclidean distance.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn entries(&self) -> Vec<StoredEntry> {
        self.entries.read().await.clone()
    }

    fn dimensions(entries: &[StoredEntry]) -> Option<usize> {
        entries.first().map(|entry| entry.embedding.len())
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn store(&self, batch: &EntryBatch, mode: WriteMode) -> Result<()> {
        let mut entries = self.entries.write().await;

        let expected = Self::dimensions(&entries)
            .or_else(|| batch.embeddings().first().map(Vec::len));
        if let Some(expected) = expected {
            if let Some(odd) = batch
                .embeddings()
                .iter()
                .find(|embedding| embedding.len() != expected)
            {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: odd.len(),
                });
            }
        }

        for entry in batch.clone().into_entries() {
            let existing = match mode {
                WriteMode::Append => None,
                WriteMode::Upsert => entries.iter().position(|stored| stored.id == entry.id),
            };
            match existing {
                Some(index) => entries[index] = entry,
                None => entries.push(entry),
            }
        }

        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<NeighborResult> {
        let entries = self.entries.read().await;

        if let Some(expected) = Self::dimensions(&entries) {
            if embedding.len() != expected {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let mut ranked = entries
            .iter()
            .map(|entry| (squared_distance(&entry.embedding, embedding), entry))
            .collect::<Vec<_>>();
        ranked.sort_by(|left, right| left.0.total_cmp(&right.0));
        ranked.truncate(k);

        let (distances, texts, metadatas) = ranked.into_iter().fold(
            (Vec::new(), Vec::new(), Vec::new()),
            |(mut distances, mut texts, mut metadatas), (distance, entry)| {
                distances.push(distance);
                texts.push(entry.text.clone());
                metadatas.push(entry.metadata.clone());
                (distances, texts, metadatas)
            },
        );

        NeighborResult::new(texts, distances, metadatas)
    }
}

fn squared_distance(left: &[f32], right: &[f32]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(a, b)| {
            let delta = f64::from(*a) - f64::from(*b);
            delta * delta
        })
        .sum()
}
