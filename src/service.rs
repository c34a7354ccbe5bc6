//! Question-answering service
//!
//! [`RagService`] is built once at startup and then shared by whatever
//! front end handles requests. Initialization never fails outright: when
//! configuration, the index backend or ingestion goes wrong, the service
//! comes up degraded, refuses questions with an error payload and reports
//! the cause through [`RagService::health`].

use crate::answer::{Answer, AnswerSynthesizer, ChatCompletionsGenerator, Generator};
use crate::chunk::chunk_documents;
use crate::config::{Config, IndexBackend};
use crate::embed::{create_embedder, Embedder};
use crate::error::{Error, Result};
use crate::index::{create_index, IndexWriter, VectorIndex, WriteSummary};
use crate::ingest::{ingest, IngestRequest, IngestSummary};
use crate::retrieve::Retriever;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of building the index from the corpus
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub built_at: DateTime<Utc>,
    pub ingest: IngestSummary,
    pub chunks: usize,
    pub write: WriteSummary,
}

/// Reply to one question: either an answer with its sources or an error message
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AskResponse {
    Answer { answer: String, sources: Vec<String> },
    Error { error: String },
}

impl AskResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, AskResponse::Error { .. })
    }
}

impl From<Result<Answer>> for AskResponse {
    fn from(result: Result<Answer>) -> Self {
        match result {
            Ok(answer) => AskResponse::Answer {
                answer: answer.text,
                sources: answer.sources,
            },
            Err(e) => AskResponse::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Initialization state and index figures
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub initialized: bool,
    pub last_error: Option<String>,
    pub index: Option<String>,
    pub indexed_vectors: Option<usize>,
}

enum ServiceState {
    Ready {
        synthesizer: AnswerSynthesizer,
        build: Option<BuildReport>,
    },
    Degraded {
        error: String,
    },
}

/// Shared pipeline handle for answering questions
pub struct RagService {
    state: ServiceState,
}

/// Embedder, index and generator the service runs on
pub struct Components {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub generator: Arc<dyn Generator>,
}

impl Components {
    /// Build the configured OpenAI-compatible clients and index backend
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder: Arc<dyn Embedder> =
            Arc::from(create_embedder(&config.embedding, config.embedding_api_key()?)?);
        let generator: Arc<dyn Generator> = Arc::new(ChatCompletionsGenerator::new(
            &config.generation,
            config.generation_api_key()?,
        )?);
        let index = create_index(config)?;

        Ok(Self {
            embedder,
            index,
            generator,
        })
    }
}

impl RagService {
    /// Validate configuration, connect the backends and build the index
    pub async fn initialize(config: &Config) -> Self {
        let components = config
            .validate()
            .and_then(|_| Components::from_config(config));

        match components {
            Ok(components) => Self::initialize_with(config, components).await,
            Err(e) => Self::degraded(e),
        }
    }

    /// Same as [`RagService::initialize`] with caller-provided components
    pub async fn initialize_with(config: &Config, components: Components) -> Self {
        let rebuild =
            config.index.backend == IndexBackend::Local || config.index.ingest_on_startup;

        let build = if rebuild {
            match build_index(config, components.embedder.as_ref(), components.index.as_ref(), false)
                .await
            {
                Ok(report) => Some(report),
                Err(e) => return Self::degraded(e),
            }
        } else {
            if let Err(e) = components.index.ensure_ready().await {
                return Self::degraded(e);
            }
            info!(
                "Using existing index {} without ingestion",
                components.index.name()
            );
            None
        };

        let retriever = Retriever::new(components.embedder, components.index);
        let synthesizer = AnswerSynthesizer::new(
            retriever,
            components.generator,
            &config.query,
            &config.generation,
        );

        info!("RAG service ready");
        Self {
            state: ServiceState::Ready { synthesizer, build },
        }
    }

    /// A service that refuses every question with `error`
    pub fn degraded(error: Error) -> Self {
        error!("RAG service failed to initialize: {}", error);
        Self {
            state: ServiceState::Degraded {
                error: error.to_string(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready { .. })
    }

    pub fn build_report(&self) -> Option<&BuildReport> {
        match &self.state {
            ServiceState::Ready { build, .. } => build.as_ref(),
            ServiceState::Degraded { .. } => None,
        }
    }

    /// Answer a question, returning the typed result
    pub async fn answer(&self, question: &str, k: Option<usize>) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(Error::InvalidQuestion(
                "question must not be empty".to_string(),
            ));
        }

        match &self.state {
            ServiceState::Ready { synthesizer, .. } => synthesizer.answer(question, k).await,
            ServiceState::Degraded { error } => Err(Error::NotInitialized(error.clone())),
        }
    }

    /// Answer a question as a response payload
    pub async fn ask(&self, question: &str, k: Option<usize>) -> AskResponse {
        let result = self.answer(question, k).await;
        if let Err(e) = &result {
            warn!("Question not answered: {}", e);
        }
        AskResponse::from(result)
    }

    pub async fn health(&self) -> Health {
        match &self.state {
            ServiceState::Ready { synthesizer, .. } => {
                let index = synthesizer.retriever().index();
                let indexed_vectors = match index.count().await {
                    Ok(count) => Some(count),
                    Err(e) => {
                        warn!("Could not count vectors in {}: {}", index.name(), e);
                        None
                    }
                };
                Health {
                    initialized: true,
                    last_error: None,
                    index: Some(index.name().to_string()),
                    indexed_vectors,
                }
            }
            ServiceState::Degraded { error } => Health {
                initialized: false,
                last_error: Some(error.clone()),
                index: None,
                indexed_vectors: None,
            },
        }
    }
}

/// Ingest the configured corpus, chunk it and write it to `index`
pub async fn build_index(
    config: &Config,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    show_progress: bool,
) -> Result<BuildReport> {
    build_index_from(
        IngestRequest::from_config(&config.corpus),
        config,
        embedder,
        index,
        show_progress,
    )
    .await
}

/// Same as [`build_index`] for an explicit set of inputs
pub async fn build_index_from(
    request: IngestRequest,
    config: &Config,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    show_progress: bool,
) -> Result<BuildReport> {
    let report = tokio::task::spawn_blocking(move || ingest(&request))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))??;

    let chunks = chunk_documents(&report.documents, &config.chunk);
    let chunk_count = chunks.len();

    // The local index is built in one pass
    let batch_size = if index.is_durable() {
        config.index.batch_size
    } else {
        chunk_count
    };

    let written = IndexWriter::new(embedder, index, batch_size, config.embedding.batch_size)
        .with_progress(show_progress)
        .write(chunks)
        .await?;

    if !written.is_complete() {
        warn!(
            "{} of {} chunks written to {}",
            written.written(),
            written.total_chunks,
            written.index
        );
    }

    Ok(BuildReport {
        built_at: Utc::now(),
        ingest: report.summary(),
        chunks: chunk_count,
        write: written.summary(),
    })
}
