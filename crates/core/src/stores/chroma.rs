use crate::config::{join_endpoint, RagConfig};
use crate::error::{RagError, Result, Service};
use crate::models::{EntryBatch, Metadata, NeighborResult, WriteMode};
use crate::traits::VectorStore;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Client for one Chroma collection addressed by id.
pub struct ChromaStore {
    client: Client,
    endpoint: String,
    collection_id: String,
}

#[derive(Serialize)]
struct WriteRequest<'a> {
    embeddings: &'a [Vec<f32>],
    metadatas: &'a [Metadata],
    documents: &'a [String],
    uris: Vec<Option<String>>,
    ids: &'a [String],
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    include: [&'static str; 3],
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    distances: Vec<Vec<f64>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<Metadata>>>,
}

impl ChromaStore {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            collection_id: collection_id.into(),
        }
    }

    pub fn from_config(client: Client, config: &RagConfig) -> Self {
        Self::new(
            client,
            config.store_endpoint.clone(),
            config.collection_id.clone(),
        )
    }

    fn collection_url(&self, action: &str) -> String {
        join_endpoint(
            &self.endpoint,
            &format!("collections/{}/{action}", self.collection_id),
        )
    }

    async fn post<T: Serialize + ?Sized>(&self, action: &str, body: &T) -> Result<String> {
        let response = self
            .client
            .post(self.collection_url(action))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!(action, status = status.as_u16(), body = %text, "chroma request failed");
            return Err(RagError::Transport {
                service: Service::VectorStore,
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn store(&self, batch: &EntryBatch, mode: WriteMode) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let action = match mode {
            WriteMode::Append => "add",
            WriteMode::Upsert => "upsert",
        };
        debug!(action, entries = batch.len(), "writing to chroma");

        let request = WriteRequest {
            embeddings: batch.embeddings(),
            metadatas: batch.metadatas(),
            documents: batch.texts(),
            uris: vec![None; batch.len()],
            ids: batch.ids(),
        };
        self.post(action, &request).await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<NeighborResult> {
        let request = QueryRequest {
            query_embeddings: [embedding],
            n_results: k,
            include: ["metadatas", "documents", "distances"],
        };
        let body = self.post("query", &request).await?;
        parse_query_response(&body)
    }
}

fn parse_query_response(body: &str) -> Result<NeighborResult> {
    let parsed: QueryResponse =
        serde_json::from_str(body).map_err(|error| RagError::Deserialization {
            service: Service::VectorStore,
            details: error.to_string(),
        })?;

    let texts = parsed
        .documents
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect::<Vec<_>>();
    let distances = parsed.distances.into_iter().next().unwrap_or_default();
    let metadatas = parsed
        .metadatas
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect::<Vec<_>>();

    NeighborResult::new(texts, distances, metadatas).map_err(|error| {
        RagError::Deserialization {
            service: Service::VectorStore,
            details: error.to_string(),
        }
    })
}
