//! Vector index backends and the batched index writer
//!
//! Two backends share the [`VectorIndex`] contract:
//! - [`LocalIndex`]: in-process, rebuilt from the corpus on every start
//! - [`QdrantIndex`]: a durable named Qdrant collection, created on demand
//!
//! Both use cosine similarity and a dimension fixed at creation.

mod local;
mod payload;
mod qdrant;
mod writer;

pub use local::*;
pub use payload::*;
pub use qdrant::*;
pub use writer::*;

use crate::chunk::Chunk;
use crate::config::{Config, IndexBackend};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Namespace for deterministic point ids
const POINT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x5e1f_6b0a_93c4_4d2e_8a71_0c3d_9b24_e6f8);

/// An embedding with a lookup-only copy of its chunk
#[derive(Debug, Clone)]
pub struct IndexedVector {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

impl IndexedVector {
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: point_id(&chunk),
            vector,
            chunk,
        }
    }
}

/// Stable UUIDv5 for a chunk, so re-ingesting overwrites instead of duplicating
pub fn point_id(chunk: &Chunk) -> Uuid {
    let name = format!(
        "{}\u{1f}{}\u{1f}{}\u{1f}{}",
        chunk.source, chunk.page, chunk.sequence, chunk.hash
    );
    Uuid::new_v5(&POINT_ID_NAMESPACE, name.as_bytes())
}

/// A retrieved chunk with its similarity score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Trait for vector index backends
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Index name (collection name for remote backends)
    fn name(&self) -> &str;

    /// Dimension every vector must have
    fn dimension(&self) -> usize;

    /// Whether the index outlives the process
    fn is_durable(&self) -> bool;

    /// Create the index if missing and wait until it accepts writes
    async fn ensure_ready(&self) -> Result<()>;

    /// Insert or replace vectors; returns how many were written
    async fn upsert(&self, vectors: Vec<IndexedVector>) -> Result<usize>;

    /// Top-`k` chunks by cosine similarity, highest score first
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of stored vectors
    async fn count(&self) -> Result<usize>;
}

/// Create the index backend selected in configuration
pub fn create_index(config: &Config) -> Result<Arc<dyn VectorIndex>> {
    match config.index.backend {
        IndexBackend::Local => Ok(Arc::new(LocalIndex::new(
            &config.index.collection_name,
            config.embedding.dimension,
        ))),
        IndexBackend::Qdrant => Ok(Arc::new(QdrantIndex::connect(
            &config.index,
            config.embedding.dimension,
            config.qdrant_api_key(),
        )?)),
    }
}

/// Call `is_ready` until it returns true, doubling the delay up to 8x `initial`
///
/// Returns the elapsed time as the error once `timeout` has passed.
pub async fn poll_with_backoff<F, Fut>(
    timeout: Duration,
    initial: Duration,
    mut is_ready: F,
) -> std::result::Result<(), Duration>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    let max_delay = initial * 8;
    let mut delay = initial;

    loop {
        if is_ready().await {
            return Ok(());
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(elapsed);
        }

        tokio::time::sleep(delay.min(timeout - elapsed)).await;
        delay = (delay * 2).min(max_delay);
    }
}
