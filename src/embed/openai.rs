use super::Embedder;
use crate::config::{parse_base_url, EmbeddingConfig};
use crate::error::{truncate_message, Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    fn into_embeddings(mut self) -> Vec<Vec<f32>> {
        if self.data.iter().all(|d| d.index.is_some()) {
            self.data.sort_by_key(|d| d.index);
        }
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}

/// Embedder for OpenAI-compatible `/v1/embeddings` endpoints
pub struct OpenAiEmbedder {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
    dimension: usize,
    retries: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            dimension: config.dimension,
            retries: config.max_retries,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid embedding API URL: {}", e)))
    }

    async fn send_with_retry<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let mut last_err: Option<Error> = None;
        for attempt in 0..=self.retries {
            let req = request
                .try_clone()
                .ok_or_else(|| Error::Embedding("Failed to clone embedding request".to_string()))?;

            let err = match req.send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(ok) => return Ok(ok.json::<T>().await?),
                    Err(e) => Error::Http(e),
                },
                Err(e) => Error::Http(e),
            };

            if !err.is_retryable() {
                return Err(Error::Embedding(truncate_message(&err.to_string(), 300)));
            }
            tracing::debug!("Embedding request attempt {} failed: {}", attempt + 1, err);
            last_err = Some(err);

            if attempt < self.retries {
                tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
            }
        }

        Err(Error::Embedding(
            last_err
                .map(|e| truncate_message(&e.to_string(), 300))
                .unwrap_or_else(|| "Embedding request failed".to_string()),
        ))
    }

    fn validate_dimensions(&self, embeddings: &[Vec<f32>]) -> Result<()> {
        if let Some(mismatch) = embeddings.iter().find(|vec| vec.len() != self.dimension) {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: mismatch.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let url = self.endpoint("v1/embeddings")?;
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body);

        let parsed: EmbeddingResponse = self.send_with_retry(request).await?;
        let embeddings = parsed.into_embeddings();
        if embeddings.len() != expected {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                expected,
                embeddings.len()
            )));
        }
        self.validate_dimensions(&embeddings)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str, dimension: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            base_url: base_url.to_string(),
            dimension,
            max_retries: 2,
            timeout_secs: 5,
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_embed_sorts_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.0, 1.0, 0.0]},
                    {"object": "embedding", "index": 0, "embedding": [1.0, 0.0, 0.0]}
                ],
                "model": "text-embedding-3-small"
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(&test_config(&server.uri(), 3), "sk-test".into()).unwrap();
        let out = embedder
            .embed(vec!["first".into(), "second".into()])
            .await
            .unwrap();

        assert_eq!(out, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [1.0, 0.0]}]
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(&test_config(&server.uri(), 3), "k".into()).unwrap();
        let err = embedder.embed(vec!["x".into()]).await.unwrap_err();

        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [0.5, 0.5, 0.5]}]
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(&test_config(&server.uri(), 3), "k".into()).unwrap();
        let out = embedder.embed(vec!["x".into()]).await.unwrap();
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(&test_config(&server.uri(), 3), "bad".into()).unwrap();
        let err = embedder.embed(vec!["x".into()]).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_base_url_path_prefix_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gateway/openai/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [0.0, 0.0, 1.0]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/gateway/openai", server.uri());
        let embedder = OpenAiEmbedder::new(&test_config(&base, 3), "k".into()).unwrap();
        let out = embedder.embed(vec!["x".into()]).await.unwrap();
        assert_eq!(out, vec![vec![0.0, 0.0, 1.0]]);
    }
}
