//! Grounded answer synthesis
//!
//! One question goes through retrieval, an optional score floor and a single
//! generation call under the grounding prompt. The synthesizer holds no
//! per-question state, so concurrent callers can share it.

pub mod generator;
pub mod prompt;

pub use generator::{ChatCompletionsGenerator, Generator};
pub use prompt::{
    is_emergency, is_not_found_reply, GroundingPrompt, DISCLAIMER, NOT_FOUND_SENTENCE,
    URGENT_CARE_SENTENCE,
};

use crate::config::{GenerationConfig, QueryConfig};
use crate::error::{Error, Result};
use crate::index::ScoredChunk;
use crate::retrieve::Retriever;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// A finished answer and the passages it was grounded on
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    /// Answer text, always ending with [`DISCLAIMER`]
    pub text: String,
    /// Citations of the passages given to the model, deduplicated in rank order
    pub sources: Vec<String>,
    pub passages: Vec<ScoredChunk>,
    /// False when the answer is the not-found response
    pub grounded: bool,
    pub emergency: bool,
}

/// Combines retrieval with generation under the grounding prompt
pub struct AnswerSynthesizer {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    prompt: GroundingPrompt,
    default_k: usize,
    min_score: f32,
}

impl AnswerSynthesizer {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn Generator>,
        query: &QueryConfig,
        generation: &GenerationConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            prompt: GroundingPrompt::new(generation.language.clone()),
            default_k: query.default_k,
            min_score: query.min_score,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer a question using the `k` most similar passages
    pub async fn answer(&self, question: &str, k: Option<usize>) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidQuestion(
                "question must not be empty".to_string(),
            ));
        }

        let k = k.unwrap_or(self.default_k);
        let emergency = is_emergency(question);
        let retrieval = self.retriever.retrieve(question, k).await?;
        let usable = retrieval.above(self.min_score);

        if usable.is_empty() {
            info!(
                "No passage reached score {} (top {:?}), answering not-found",
                self.min_score,
                retrieval.top_score()
            );
            return Ok(Answer {
                question: question.to_string(),
                text: finalize_answer(NOT_FOUND_SENTENCE, emergency),
                sources: Vec::new(),
                passages: Vec::new(),
                grounded: false,
                emergency,
            });
        }

        let prompt = self.prompt.render(question, &usable, emergency);
        debug!(
            "Generating with {} passages ({} prompt chars) using {}",
            usable.len(),
            prompt.chars().count(),
            self.generator.model_name()
        );

        let raw = self.generator.generate(&prompt).await.map_err(|e| match e {
            Error::Generation(message) => Error::Generation(message),
            other => Error::Generation(other.to_string()),
        })?;

        let grounded = !is_not_found_reply(&raw);
        let sources = collect_sources(&usable);
        let passages = usable.into_iter().cloned().collect();

        Ok(Answer {
            question: question.to_string(),
            text: finalize_answer(&raw, emergency),
            sources,
            passages,
            grounded,
            emergency,
        })
    }
}

fn collect_sources(passages: &[&ScoredChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for passage in passages {
        let citation = passage.chunk.citation();
        if !sources.contains(&citation) {
            sources.push(citation);
        }
    }
    sources
}

/// Ensure the urgent-care line (for emergencies) is present and the disclaimer comes last
pub fn finalize_answer(raw: &str, emergency: bool) -> String {
    let mut body = raw.replace(DISCLAIMER, "").trim_end().to_string();

    if emergency && !body.contains(URGENT_CARE_SENTENCE) {
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(URGENT_CARE_SENTENCE);
    }

    if !body.is_empty() {
        body.push_str("\n\n");
    }
    body.push_str(DISCLAIMER);
    body
}
