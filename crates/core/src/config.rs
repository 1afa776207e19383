use crate::chunking::ChunkingConfig;
use crate::error::{RagError, Result};
use crate::models::IdStrategy;
use reqwest::Client;
use std::time::Duration;
use url::Url;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api";
pub const DEFAULT_CHROMA_URL: &str =
    "http://localhost:8000/api/v2/tenants/default_tenant/databases/default_database";
pub const DEFAULT_MODEL: &str = "mistral:latest";
pub const DEFAULT_TOP_K: usize = 4;

/// Everything the pipeline needs to reach its collaborators.
///
/// Built once at startup and handed to the clients and the orchestrator.
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub embedding_endpoint: String,
    pub generation_endpoint: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub store_endpoint: String,
    pub collection_id: String,
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub request_timeout: Duration,
    pub embed_concurrency: usize,
    pub id_strategy: IdStrategy,
    pub embedding_dimensions: Option<usize>,
}

impl RagConfig {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            embedding_endpoint: DEFAULT_OLLAMA_URL.to_string(),
            generation_endpoint: DEFAULT_OLLAMA_URL.to_string(),
            embedding_model: DEFAULT_MODEL.to_string(),
            generation_model: DEFAULT_MODEL.to_string(),
            store_endpoint: DEFAULT_CHROMA_URL.to_string(),
            collection_id: collection_id.into(),
            chunking: ChunkingConfig::default(),
            top_k: DEFAULT_TOP_K,
            request_timeout: Duration::from_secs(600),
            embed_concurrency: 4,
            id_strategy: IdStrategy::default(),
            embedding_dimensions: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in [
            ("embedding endpoint", &self.embedding_endpoint),
            ("generation endpoint", &self.generation_endpoint),
            ("vector store endpoint", &self.store_endpoint),
        ] {
            let parsed = Url::parse(endpoint)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(RagError::Validation(format!(
                    "{name} must be http(s), got {endpoint}"
                )));
            }
        }

        for (name, value) in [
            ("embedding model", &self.embedding_model),
            ("generation model", &self.generation_model),
            ("collection id", &self.collection_id),
        ] {
            if value.trim().is_empty() {
                return Err(RagError::Validation(format!("{name} is required")));
            }
        }

        self.chunking.validate()?;

        if self.top_k == 0 {
            return Err(RagError::Validation(
                "number of neighbors must be greater than zero".to_string(),
            ));
        }
        if self.embed_concurrency == 0 {
            return Err(RagError::Validation(
                "embedding concurrency must be greater than zero".to_string(),
            ));
        }
        if self.embedding_dimensions == Some(0) {
            return Err(RagError::Validation(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// HTTP client shared by every collaborator, with the configured timeout.
    pub fn http_client(&self) -> Result<Client> {
        Ok(Client::builder().timeout(self.request_timeout).build()?)
    }
}

pub(crate) fn join_endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::new("c3a37a72-0b43-4e91-a765-299d6b81eda2");
        assert!(config.validate().is_ok());
        assert_eq!(config.top_k, 4);
        assert_eq!(config.chunking.chunk_size, 100);
        assert_eq!(config.chunking.overlap_size, 20);
    }

    #[test]
    fn missing_collection_is_rejected() {
        let config = RagConfig::new("  ");
        assert!(matches!(config.validate(), Err(RagError::Validation(_))));
    }

    #[test]
    fn malformed_endpoint_is_rejected() {
        let mut config = RagConfig::new("stock_advice");
        config.store_endpoint = "not a url".to_string();
        assert!(matches!(config.validate(), Err(RagError::Url(_))));

        config.store_endpoint = "ftp://localhost:8000".to_string();
        assert!(matches!(config.validate(), Err(RagError::Validation(_))));
    }

    #[test]
    fn zero_neighbors_and_zero_workers_are_rejected() {
        let mut config = RagConfig::new("stock_advice");
        config.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = RagConfig::new("stock_advice");
        config.embed_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn endpoints_join_with_single_slash() {
        assert_eq!(
            join_endpoint("http://localhost:11434/api/", "/embeddings"),
            "http://localhost:11434/api/embeddings"
        );
        assert_eq!(
            join_endpoint("http://localhost:11434/api", "generate"),
            "http://localhost:11434/api/generate"
        );
    }
}
