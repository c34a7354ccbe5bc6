//! Similarity retrieval over a vector index

use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::index::{ScoredChunk, VectorIndex};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Ordered retrieval hits, highest score first, at most `k` long
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn top_score(&self) -> Option<f32> {
        self.hits.first().map(|h| h.score)
    }

    /// Keep only hits scoring at least `min_score`
    pub fn above(&self, min_score: f32) -> Vec<&ScoredChunk> {
        self.hits.iter().filter(|h| h.score >= min_score).collect()
    }
}

/// Embeds queries and runs k-NN search; never writes to the index
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    /// Return the `k` chunks most similar to `query`
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Ok(RetrievalResult::default());
        }

        let vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| Error::Retrieval(format!("query embedding failed: {}", e)))?;

        let mut hits = self
            .index
            .search(&vector, k)
            .await
            .map_err(|e| Error::Retrieval(format!("index search failed: {}", e)))?;

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        debug!(
            "Retrieved {} chunks (top score {:?}) from {}",
            hits.len(),
            hits.first().map(|h| h.score),
            self.index.name()
        );

        Ok(RetrievalResult { hits })
    }
}
