//! Ingest command implementation

use crate::config::Config;
use crate::embed::create_embedder;
use crate::error::Result;
use crate::index::create_index;
use crate::ingest::IngestRequest;
use crate::service::{build_index_from, BuildReport};
use std::path::PathBuf;
use tracing::info;

/// Inputs for `ingest`; empty means the configured corpus
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub dir: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

impl IngestOptions {
    fn into_request(self, config: &Config) -> IngestRequest {
        if self.dir.is_none() && self.files.is_empty() {
            IngestRequest::from_config(&config.corpus)
        } else {
            IngestRequest {
                files: self.files,
                dir: self.dir,
            }
        }
    }
}

/// Ingest, chunk and index the corpus
pub async fn cmd_ingest(config: &Config, options: IngestOptions) -> Result<BuildReport> {
    config.validate()?;

    let embedder = create_embedder(&config.embedding, config.embedding_api_key()?)?;
    let index = create_index(config)?;
    info!(
        "Indexing into {} ({} backend) with {}",
        index.name(),
        config.index.backend,
        embedder.model_name()
    );

    let request = options.into_request(config);
    build_index_from(request, config, embedder.as_ref(), index.as_ref(), true).await
}

/// Print build statistics to console
pub fn print_build_report(report: &BuildReport, durable: bool) {
    println!("\n📥 Ingestion Complete ({})\n", report.built_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Files loaded: {}", report.ingest.succeeded);
    println!("Files failed: {}", report.ingest.failed);
    println!("Files skipped: {}", report.ingest.skipped);

    if !report.ingest.failures.is_empty() {
        println!("\nFailed files:");
        for failure in &report.ingest.failures {
            println!("  • {}: {}", failure.file, failure.reason);
        }
    }

    println!("\nChunks created: {}", report.chunks);
    println!(
        "Vectors written: {} / {} ({} batches)",
        report.write.written, report.write.total_chunks, report.write.batches
    );
    if report.write.embedding_failures > 0 {
        println!("Chunks not embedded: {}", report.write.embedding_failures);
    }

    if !report.write.failed_batches.is_empty() {
        println!("\nFailed batches:");
        for batch in &report.write.failed_batches {
            println!("  • batch {} ({} chunks): {}", batch.batch, batch.chunks, batch.error);
        }
    }

    if !durable {
        println!("\nThe local index lives only for this process; `ask` rebuilds it on startup.");
    }
}
