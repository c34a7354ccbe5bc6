//! Embedding generation
//!
//! This module provides an abstraction over embedding models with:
//! - A trait for different embedding backends
//! - An OpenAI-compatible HTTP backend
//! - Batch processing for efficiency

mod openai;

pub use openai::*;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input in input order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Embedding backend returned no vector".to_string()))
    }

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig, api_key: String) -> Result<Box<dyn Embedder>> {
    let embedder = OpenAiEmbedder::new(config, api_key)?;
    Ok(Box::new(embedder))
}

/// Helper to embed in batches
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size.max(1)) {
        let batch_texts: Vec<String> = chunk.to_vec();
        let embeddings = embedder.embed(batch_texts).await?;
        if embeddings.len() != chunk.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunk.len(),
                embeddings.len()
            )));
        }
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingEmbedder;

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_embed_in_batches_keeps_order() {
        let texts: Vec<String> = (0..10).map(|i| "x".repeat(i)).collect();
        let embeddings = embed_in_batches(&CountingEmbedder, texts, 3).await.unwrap();

        assert_eq!(embeddings.len(), 10);
        for (i, e) in embeddings.iter().enumerate() {
            assert_eq!(e[0], i as f32);
        }
    }

    #[tokio::test]
    async fn test_embed_query() {
        let v = CountingEmbedder.embed_query("abcd").await.unwrap();
        assert_eq!(v, vec![4.0, 1.0]);
    }
}
