//! Batched index writer
//!
//! Chunks are embedded and written in fixed-size batches, strictly in
//! order. A failed batch is logged and recorded in the [`WriteReport`];
//! later batches still run and nothing already written is rolled back.

use super::{IndexedVector, VectorIndex};
use crate::chunk::Chunk;
use crate::embed::{embed_in_batches, Embedder};
use crate::error::{truncate_message, Error, Result};
use crate::progress::batch_progress;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of writing one batch
#[derive(Debug)]
pub struct BatchOutcome {
    /// 1-based batch number
    pub batch: usize,
    /// Chunks in the batch
    pub chunks: usize,
    /// Chunks that could not be embedded and were left out
    pub embedding_failures: usize,
    /// Vectors written, or why the batch failed
    pub result: Result<usize>,
}

impl BatchOutcome {
    pub fn written(&self) -> usize {
        self.result.as_ref().copied().unwrap_or(0)
    }

    pub fn is_failed(&self) -> bool {
        self.result.is_err()
    }
}

/// Per-batch results of one write
#[derive(Debug, Default)]
pub struct WriteReport {
    pub index: String,
    pub total_chunks: usize,
    pub batches: Vec<BatchOutcome>,
}

/// Serializable summary of a [`WriteReport`]
#[derive(Debug, Clone, Serialize)]
pub struct WriteSummary {
    pub index: String,
    pub total_chunks: usize,
    pub written: usize,
    pub batches: usize,
    pub failed_batches: Vec<FailedBatch>,
    pub embedding_failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedBatch {
    pub batch: usize,
    pub chunks: usize,
    pub error: String,
}

impl WriteReport {
    pub fn written(&self) -> usize {
        self.batches.iter().map(BatchOutcome::written).sum()
    }

    pub fn failed_batches(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.batches.iter().filter(|b| b.is_failed())
    }

    pub fn embedding_failures(&self) -> usize {
        self.batches.iter().map(|b| b.embedding_failures).sum()
    }

    /// True when every chunk ended up in the index
    pub fn is_complete(&self) -> bool {
        self.written() == self.total_chunks
    }

    pub fn summary(&self) -> WriteSummary {
        WriteSummary {
            index: self.index.clone(),
            total_chunks: self.total_chunks,
            written: self.written(),
            batches: self.batches.len(),
            failed_batches: self
                .failed_batches()
                .map(|b| FailedBatch {
                    batch: b.batch,
                    chunks: b.chunks,
                    error: b
                        .result
                        .as_ref()
                        .err()
                        .map(|e| truncate_message(&e.to_string(), 200))
                        .unwrap_or_default(),
                })
                .collect(),
            embedding_failures: self.embedding_failures(),
        }
    }
}

/// Embeds chunks and writes them to a [`VectorIndex`]
pub struct IndexWriter<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    batch_size: usize,
    embed_batch_size: usize,
    show_progress: bool,
}

impl<'a> IndexWriter<'a> {
    /// `batch_size` chunks per index write; `embed_batch_size` texts per embedding request
    pub fn new(
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
        batch_size: usize,
        embed_batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            batch_size: batch_size.max(1),
            embed_batch_size: embed_batch_size.max(1),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Ensure the index is ready, then write every chunk batch by batch
    ///
    /// Only readiness failures abort the write; batch failures are recorded.
    pub async fn write(&self, chunks: Vec<Chunk>) -> Result<WriteReport> {
        if self.embedder.dimension() != self.index.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.index.dimension(),
                actual: self.embedder.dimension(),
            });
        }

        self.index.ensure_ready().await?;

        let mut report = WriteReport {
            index: self.index.name().to_string(),
            total_chunks: chunks.len(),
            batches: Vec::new(),
        };
        if chunks.is_empty() {
            return Ok(report);
        }

        let total_batches = chunks.len().div_ceil(self.batch_size);
        let progress = batch_progress(total_batches as u64, self.show_progress);

        for (i, batch) in chunks.chunks(self.batch_size).enumerate() {
            let number = i + 1;
            let outcome = self.write_batch(number, batch).await;

            match &outcome.result {
                Ok(written) => debug!(
                    "Batch {}/{} wrote {} vectors to {}",
                    number,
                    total_batches,
                    written,
                    self.index.name()
                ),
                Err(e) => warn!(
                    "Batch {}/{} ({} chunks) failed: {}",
                    number,
                    total_batches,
                    batch.len(),
                    truncate_message(&e.to_string(), 200)
                ),
            }

            report.batches.push(outcome);
            progress.inc(1);
        }
        progress.finish_and_clear();

        let failed = report.failed_batches().count();
        info!(
            "Indexed {}/{} chunks into {} ({} of {} batches failed, {} embedding failures)",
            report.written(),
            report.total_chunks,
            report.index,
            failed,
            total_batches,
            report.embedding_failures()
        );

        Ok(report)
    }

    async fn write_batch(&self, number: usize, batch: &[Chunk]) -> BatchOutcome {
        let (vectors, embedding_failures) = self.embed_batch(batch).await;

        let result = if vectors.is_empty() {
            Err(Error::Embedding(format!(
                "no chunk in batch {} could be embedded",
                number
            )))
        } else {
            self.index.upsert(vectors).await
        };

        BatchOutcome {
            batch: number,
            chunks: batch.len(),
            embedding_failures,
            result,
        }
    }

    /// Embed a batch; if the batch request fails, retry item by item
    async fn embed_batch(&self, batch: &[Chunk]) -> (Vec<IndexedVector>, usize) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

        match embed_in_batches(self.embedder, texts, self.embed_batch_size).await {
            Ok(embeddings) => {
                let vectors = batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(chunk, vector)| IndexedVector::new(chunk, vector))
                    .collect();
                (vectors, 0)
            }
            Err(e) => {
                debug!("Batch embedding failed ({}), embedding items one by one", e);
                let mut vectors = Vec::with_capacity(batch.len());
                let mut failures = 0;
                for chunk in batch {
                    match self.embedder.embed_query(&chunk.text).await {
                        Ok(vector) => vectors.push(IndexedVector::new(chunk.clone(), vector)),
                        Err(e) => {
                            failures += 1;
                            warn!(
                                "Skipping chunk {} of {}: embedding failed: {}",
                                chunk.sequence,
                                chunk.source,
                                truncate_message(&e.to_string(), 200)
                            );
                        }
                    }
                }
                (vectors, failures)
            }
        }
    }
}
