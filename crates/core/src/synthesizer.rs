use crate::config::{join_endpoint, RagConfig};
use crate::error::{RagError, Result, Service};
use crate::traits::Generator;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Returned when the model answers successfully but without a `response` field.
pub const NO_RESPONSE_FALLBACK: &str = "No response from AI";

/// Non-streaming client for an Ollama-compatible `/generate` endpoint.
#[derive(Clone)]
pub struct OllamaGenerator {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

impl OllamaGenerator {
    pub fn new(client: Client, base_url: impl AsRef<str>, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: join_endpoint(base_url.as_ref(), "generate"),
            model: model.into(),
        }
    }

    pub fn from_config(client: Client, config: &RagConfig) -> Self {
        Self::new(
            client,
            &config.generation_endpoint,
            config.generation_model.clone(),
        )
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "generation request failed");
            return Err(RagError::Transport {
                service: Service::Generation,
                status: status.as_u16(),
                body,
            });
        }

        extract_answer(&body)
    }
}

fn extract_answer(body: &str) -> Result<String> {
    let parsed: Value = serde_json::from_str(body).map_err(|error| RagError::Deserialization {
        service: Service::Generation,
        details: error.to_string(),
    })?;

    let answer = parsed.as_object().and_then(|fields| {
        fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("response"))
            .and_then(|(_, value)| value.as_str())
    });

    Ok(answer.unwrap_or(NO_RESPONSE_FALLBACK).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_fixed;
    use serde_json::json;

    #[test]
    fn answer_field_lookup_ignores_case() {
        assert_eq!(extract_answer(r#"{"response":"Hold."}"#).unwrap(), "Hold.");
        assert_eq!(extract_answer(r#"{"Response":"Sell."}"#).unwrap(), "Sell.");
    }

    #[test]
    fn missing_answer_field_falls_back() {
        assert_eq!(
            extract_answer(r#"{"done":true}"#).unwrap(),
            NO_RESPONSE_FALLBACK
        );
        assert_eq!(
            extract_answer(r#"{"response":null}"#).unwrap(),
            NO_RESPONSE_FALLBACK
        );
    }

    #[test]
    fn non_json_body_is_a_deserialization_error() {
        assert!(matches!(
            extract_answer("<html>"),
            Err(RagError::Deserialization {
                service: Service::Generation,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn generate_disables_streaming() {
        let server = serve_fixed(200, r#"{"model":"mistral","response":"Buy.","done":true}"#).await;
        let generator = OllamaGenerator::new(Client::new(), &server.base_url, "mistral:latest");

        let answer = generator.generate("Context: x\nQuestion: y\nAnswer:").await.unwrap();

        assert_eq!(answer, "Buy.");
        let requests = server.requests().await;
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/generate");
        assert_eq!(
            requests[0].json(),
            json!({
                "model": "mistral:latest",
                "prompt": "Context: x\nQuestion: y\nAnswer:",
                "stream": false
            })
        );
    }

    #[tokio::test]
    async fn error_status_is_a_transport_error() {
        let server = serve_fixed(503, "overloaded").await;
        let generator = OllamaGenerator::new(Client::new(), &server.base_url, "mistral:latest");

        let error = generator.generate("prompt").await.expect_err("503 must fail");
        assert!(matches!(
            error,
            RagError::Transport {
                service: Service::Generation,
                status: 503,
                ..
            }
        ));
    }
}
