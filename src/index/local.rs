//! In-process vector index using cosine similarity

use super::{IndexedVector, ScoredChunk, VectorIndex};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Entries {
    vectors: Vec<IndexedVector>,
    positions: HashMap<Uuid, usize>,
}

/// Vectors held in memory for the lifetime of the process
#[derive(Debug)]
pub struct LocalIndex {
    name: String,
    dimension: usize,
    entries: RwLock<Entries>,
}

impl LocalIndex {
    pub fn new(name: &str, dimension: usize) -> Self {
        Self {
            name: name.to_string(),
            dimension,
            entries: RwLock::new(Entries::default()),
        }
    }
}

/// Cosine similarity; 0.0 if either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for LocalIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_durable(&self) -> bool {
        false
    }

    async fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, vectors: Vec<IndexedVector>) -> Result<usize> {
        if let Some(bad) = vectors.iter().find(|v| v.vector.len() != self.dimension) {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: bad.vector.len(),
            });
        }

        let written = vectors.len();
        let mut entries = self.entries.write().await;
        for vector in vectors {
            match entries.positions.get(&vector.id).copied() {
                Some(pos) => entries.vectors[pos] = vector,
                None => {
                    let pos = entries.vectors.len();
                    entries.positions.insert(vector.id, pos);
                    entries.vectors.push(vector);
                }
            }
        }
        Ok(written)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredChunk> = entries
            .vectors
            .iter()
            .map(|v| ScoredChunk {
                chunk: v.chunk.clone(),
                score: cosine_similarity(&v.vector, query),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.vectors.len())
    }
}
