//! Qdrant vector database backend
//!
//! This module wraps the Qdrant client and provides:
//! - Collection creation with a fixed dimension and cosine distance
//! - Bounded readiness polling after creation
//! - Per-batch atomic upserts and vector search
//!
//! Every request runs under the configured request timeout.

use super::{poll_with_backoff, ChunkPayload, IndexedVector, ScoredChunk, VectorIndex};
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CollectionStatus, CreateCollectionBuilder, Distance, GetCollectionInfoResponse,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Durable named collection in Qdrant
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
    ready_timeout: Duration,
    poll_interval: Duration,
    request_timeout: Duration,
}

impl QdrantIndex {
    /// Build a client for the configured Qdrant URL; no request is made yet
    pub fn connect(config: &IndexConfig, dimension: usize, api_key: Option<String>) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", config.qdrant_url);

        let client = Qdrant::from_url(&config.qdrant_url)
            .api_key(api_key)
            .timeout(config.request_timeout())
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection_name.clone(),
            dimension,
            ready_timeout: config.ready_timeout(),
            poll_interval: config.ready_poll_interval(),
            request_timeout: config.request_timeout(),
        })
    }

    /// Run one Qdrant request under the request timeout
    async fn call<T, F>(&self, operation: &str, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, QdrantError>>,
    {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Timeout {
                operation: format!("qdrant {}", operation),
                after: self.request_timeout,
            }),
        }
    }

    async fn collection_info(&self) -> Result<GetCollectionInfoResponse> {
        self.call(
            "collection_info",
            self.client.collection_info(&self.collection),
        )
        .await
    }

    async fn is_serving(&self) -> bool {
        match self.collection_info().await {
            Ok(info) => info
                .result
                .map(|r| status_is_serving(r.status()))
                .unwrap_or(false),
            Err(e) => {
                debug!("Collection {} not ready yet: {}", self.collection, e);
                false
            }
        }
    }
}

/// Green, Yellow (optimizing) and Grey (optimizations pending) all serve
/// reads and writes; only Red is a failed collection.
fn status_is_serving(status: CollectionStatus) -> bool {
    matches!(
        status,
        CollectionStatus::Green | CollectionStatus::Yellow | CollectionStatus::Grey
    )
}

/// Reject an existing collection whose vector size or metric differs
fn check_existing(
    collection: &str,
    info: &GetCollectionInfoResponse,
    dimension: usize,
) -> Result<()> {
    match unnamed_vector_params(info) {
        Some((size, _)) if size != dimension => Err(Error::DimensionMismatch {
            expected: size,
            actual: dimension,
        }),
        Some((_, Distance::Cosine)) => Ok(()),
        Some((_, distance)) => Err(Error::Qdrant(format!(
            "Collection '{}' uses {} distance, expected Cosine",
            collection,
            distance.as_str_name()
        ))),
        None => Err(Error::Qdrant(format!(
            "Collection '{}' does not use a single unnamed vector",
            collection
        ))),
    }
}

/// Size and distance of a collection's unnamed vector, if it has one
fn unnamed_vector_params(info: &GetCollectionInfoResponse) -> Option<(usize, Distance)> {
    let result = info.result.as_ref()?;
    let config = result.config.as_ref()?;
    let params = config.params.as_ref()?;
    let vectors_config = params.vectors_config.as_ref()?;

    match vectors_config.config.as_ref()? {
        qdrant_client::qdrant::vectors_config::Config::Params(params) => {
            Some((params.size as usize, params.distance()))
        }
        qdrant_client::qdrant::vectors_config::Config::ParamsMap(_) => None,
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn name(&self) -> &str {
        &self.collection
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_durable(&self) -> bool {
        true
    }

    async fn ensure_ready(&self) -> Result<()> {
        let exists = self
            .call(
                "collection_exists",
                self.client.collection_exists(&self.collection),
            )
            .await?;

        if exists {
            let info = self.collection_info().await?;
            check_existing(&self.collection, &info, self.dimension)?;
            info!("Using existing collection {}", self.collection);
            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );
        self.call(
            "create_collection",
            self.client.create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ),
            ),
        )
        .await?;

        poll_with_backoff(self.ready_timeout, self.poll_interval, || self.is_serving())
            .await
            .map_err(|waited| {
                warn!(
                    "Collection {} not ready after {:?}",
                    self.collection, waited
                );
                Error::BackendNotReady {
                    index: self.collection.clone(),
                    waited,
                }
            })?;

        info!("Collection {} is ready", self.collection);
        Ok(())
    }

    async fn upsert(&self, vectors: Vec<IndexedVector>) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        if let Some(bad) = vectors.iter().find(|v| v.vector.len() != self.dimension) {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: bad.vector.len(),
            });
        }

        let count = vectors.len();
        debug!("Upserting {} points to collection {}", count, self.collection);

        let points = vectors.iter().map(IndexedVector::to_point_struct).collect::<Vec<_>>();
        self.call(
            "upsert_points",
            self.client
                .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true)),
        )
        .await?;

        Ok(count)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        debug!("Searching collection {} with limit {}", self.collection, k);

        let response = self
            .call(
                "search_points",
                self.client.search_points(
                    SearchPointsBuilder::new(&self.collection, query.to_vec(), k as u64)
                        .with_payload(true),
                ),
            )
            .await?;

        let mut results = Vec::with_capacity(response.result.len());
        for point in response.result {
            match ChunkPayload::from_qdrant_payload(point.payload) {
                Ok(payload) => results.push(ScoredChunk {
                    chunk: payload.into_chunk(),
                    score: point.score,
                }),
                Err(e) => warn!("Skipping point with unreadable payload: {}", e),
            }
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let info = self.collection_info().await?;
        Ok(info
            .result
            .and_then(|r| r.points_count)
            .unwrap_or(0) as usize)
    }
}
