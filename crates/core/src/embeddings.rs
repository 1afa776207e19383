use crate::config::{join_endpoint, RagConfig};
use crate::error::{RagError, Result, Service};
use crate::models::Embedding;
use crate::traits::Embedder;
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Embedding client for an Ollama-compatible `/embeddings` endpoint.
///
/// The endpoint takes one prompt per request, so batches fan out into
/// `concurrency` requests in flight at a time.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    concurrency: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(
        client: Client,
        base_url: impl AsRef<str>,
        model: impl Into<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            endpoint: join_endpoint(base_url.as_ref(), "embeddings"),
            model: model.into(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_config(client: Client, config: &RagConfig) -> Self {
        Self::new(
            client,
            &config.embedding_endpoint,
            config.embedding_model.clone(),
            config.embed_concurrency,
        )
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body, "embedding request failed");
            return Err(RagError::Transport {
                service: Service::Embedding,
                status: status.as_u16(),
                body,
            });
        }

        parse_embedding(&body)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let requests = texts
            .iter()
            .map(|text| self.embed_one(text))
            .collect::<Vec<_>>();
        let embeddings: Vec<Embedding> = stream::iter(requests)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        debug!(
            chunks = texts.len(),
            embeddings = embeddings.len(),
            "embedded batch"
        );
        check_batch(texts.len(), &embeddings)?;
        Ok(embeddings)
    }
}

fn parse_embedding(body: &str) -> Result<Embedding> {
    let parsed: EmbeddingResponse =
        serde_json::from_str(body).map_err(|error| RagError::Deserialization {
            service: Service::Embedding,
            details: error.to_string(),
        })?;

    if parsed.embedding.is_empty() {
        return Err(RagError::Deserialization {
            service: Service::Embedding,
            details: "response carried an empty embedding".to_string(),
        });
    }

    Ok(parsed.embedding)
}

/// Enforces one embedding per input and a single dimensionality.
pub fn check_batch(expected: usize, embeddings: &[Embedding]) -> Result<()> {
    if embeddings.len() != expected {
        return Err(RagError::CountMismatch {
            stage: "embedding batch",
            expected,
            actual: embeddings.len(),
        });
    }

    if let Some(first) = embeddings.first() {
        if let Some(odd) = embeddings.iter().find(|vector| vector.len() != first.len()) {
            return Err(RagError::DimensionMismatch {
                expected: first.len(),
                actual: odd.len(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, serve_fixed};
    use serde_json::json;

    fn embedder(base_url: &str, concurrency: usize) -> OllamaEmbedder {
        OllamaEmbedder::new(Client::new(), base_url, "mistral:latest", concurrency)
    }

    #[tokio::test]
    async fn embed_one_posts_model_and_prompt() {
        let server = serve_fixed(200, r#"{"embedding":[0.25,0.5,0.75]}"#).await;

        let vector = embedder(&server.base_url, 1)
            .embed_one("Should I buy?")
            .await
            .expect("embedding should succeed");

        assert_eq!(vector, vec![0.25, 0.5, 0.75]);
        let requests = server.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/embeddings");
        assert_eq!(
            requests[0].json(),
            json!({ "model": "mistral:latest", "prompt": "Should I buy?" })
        );
    }

    #[test]
    fn zero_concurrency_still_sends_requests() {
        assert_eq!(embedder("http://127.0.0.1:1", 0).concurrency, 1);
    }

    #[tokio::test]
    async fn batch_preserves_input_order_under_concurrency() {
        let server = serve(|request| {
            let prompt = request.json()["prompt"].as_str().unwrap_or_default().to_string();
            let marker = prompt.trim_start_matches("chunk-").parse::<f32>().unwrap_or(-1.0);
            (200, json!({ "embedding": [marker, 1.0] }).to_string())
        })
        .await;

        let texts = (0..12).map(|index| format!("chunk-{index}")).collect::<Vec<_>>();
        let vectors = embedder(&server.base_url, 4)
            .embed_batch(&texts)
            .await
            .expect("batch should succeed");

        assert_eq!(vectors.len(), texts.len());
        for (index, vector) in vectors.iter().enumerate() {
            assert_eq!(vector[0], index as f32);
        }
        assert_eq!(server.requests().await.len(), 12);
    }

    #[tokio::test]
    async fn one_failed_request_fails_the_batch() {
        let server = serve(|request| {
            if request.json()["prompt"] == "bad" {
                (500, "model crashed".to_string())
            } else {
                (200, r#"{"embedding":[1.0]}"#.to_string())
            }
        })
        .await;

        let texts = vec!["good".to_string(), "bad".to_string(), "good".to_string()];
        let error = embedder(&server.base_url, 2)
            .embed_batch(&texts)
            .await
            .expect_err("batch must fail");

        match error {
            RagError::Transport {
                service,
                status,
                body,
            } => {
                assert_eq!(service, Service::Embedding);
                assert_eq!(status, 500);
                assert_eq!(body, "model crashed");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_a_deserialization_error() {
        let server = serve_fixed(200, r#"{"vector":[1.0]}"#).await;

        let error = embedder(&server.base_url, 1)
            .embed_one("text")
            .await
            .expect_err("payload is malformed");

        assert!(matches!(
            error,
            RagError::Deserialization {
                service: Service::Embedding,
                ..
            }
        ));
    }

    #[test]
    fn check_batch_names_expected_and_actual_counts() {
        let error = check_batch(3, &[vec![0.1], vec![0.2]]).expect_err("count differs");
        assert_eq!(error.to_string(), "embedding batch: expected 3 items, got 2");
    }

    #[test]
    fn check_batch_rejects_mixed_dimensions() {
        let error = check_batch(2, &[vec![0.1, 0.2], vec![0.3]]).expect_err("dims differ");
        assert!(matches!(
            error,
            RagError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }
}
