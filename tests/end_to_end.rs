//! End-to-end pipeline tests with a deterministic embedder and scripted model

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use vetrag::answer::{Generator, DISCLAIMER, NOT_FOUND_SENTENCE, URGENT_CARE_SENTENCE};
use vetrag::embed::Embedder;
use vetrag::index::LocalIndex;
use vetrag::service::Components;
use vetrag::{AskResponse, Config, RagService, Result};

const DIMENSION: usize = 256;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "what", "which", "with", "can", "its", "this", "that",
    "from", "into", "than", "how", "does", "after", "about", "your", "you", "has", "have",
];

/// Bag-of-words embedding where each new word gets its own dimension
#[derive(Default)]
struct VocabularyEmbedder {
    vocabulary: Mutex<HashMap<String, usize>>,
}

impl VocabularyEmbedder {
    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vocabulary = self.vocabulary.lock().unwrap();
        let mut vector = vec![0.0; DIMENSION];

        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2 && !STOPWORDS.contains(w))
        {
            let next = vocabulary.len();
            let slot = *vocabulary.entry(word.to_string()).or_insert(next);
            if slot < DIMENSION {
                vector[slot] += 1.0;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for VocabularyEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "vocabulary"
    }
}

/// Answers from the prompt's context, like a well-behaved model would
#[derive(Default)]
struct ScriptedGenerator {
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let context = prompt
            .split("[Context]")
            .nth(1)
            .and_then(|rest| rest.split("[Question]").next())
            .unwrap_or_default()
            .to_lowercase();
        let question = prompt
            .split("[Question]")
            .nth(1)
            .unwrap_or_default()
            .to_lowercase();

        if question.contains("chocolate") && context.contains("theobromine") {
            Ok(format!(
                "Summary: Chocolate is toxic to dogs because it contains theobromine.\n\
                 Explanation: Dogs metabolize theobromine slowly.\n\
                 Cautions: Dark chocolate carries the most theobromine.\n\
                 Sources: chocolate.md\n\n{}",
                DISCLAIMER
            ))
        } else {
            // Deliberately omit the disclaimer
            Ok(NOT_FOUND_SENTENCE.to_string())
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn write_corpus(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("chocolate.md"),
        "# Chocolate toxicity\n\n\
         Chocolate contains theobromine and caffeine. Dogs metabolize theobromine slowly, \
         so even moderate amounts of dark chocolate cause vomiting, tremors and arrhythmia.",
    )
    .unwrap();
    std::fs::write(
        dir.join("grapes.txt"),
        "Grapes and raisins can cause acute kidney injury in dogs. The toxic dose is unpredictable.",
    )
    .unwrap();
    std::fs::write(
        dir.join("vaccines.csv"),
        "vaccine,species,interval\nrabies,dog,annual\nFVRCP,cat,triennial\n",
    )
    .unwrap();
    std::fs::write(dir.join("scan.png"), b"\x89PNG\r\n\x1a\n").unwrap();
}

fn config_for(dir: &TempDir, min_score: f32) -> Config {
    let mut config = Config::with_base_dir(dir.path().to_path_buf());
    config.corpus.documents_dir = dir.path().join("documents");
    config.embedding.dimension = DIMENSION;
    config.query.default_k = 2;
    config.query.min_score = min_score;
    config
}

async fn start(config: &Config, generator: Arc<ScriptedGenerator>) -> RagService {
    let components = Components {
        embedder: Arc::new(VocabularyEmbedder::default()),
        index: Arc::new(LocalIndex::new("end_to_end", DIMENSION)),
        generator,
    };
    RagService::initialize_with(config, components).await
}

#[tokio::test]
async fn chocolate_question_is_answered_with_disclaimer() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 0.1);
    write_corpus(&config.corpus.documents_dir);
    let generator = Arc::new(ScriptedGenerator::default());

    let service = start(&config, generator.clone()).await;
    assert!(service.is_ready());

    let report = service.build_report().unwrap();
    assert_eq!(report.ingest.succeeded, 3);
    assert_eq!(report.ingest.skipped, 1);
    assert!(report.write.failed_batches.is_empty());

    match service.ask("My dog ate chocolate. Is it dangerous?", None).await {
        AskResponse::Answer { answer, sources } => {
            assert!(answer.contains("theobromine"));
            assert!(answer.ends_with(DISCLAIMER));
            assert_eq!(answer.matches(DISCLAIMER).count(), 1);
            assert_eq!(sources.first().map(String::as_str), Some("chocolate.md"));
        }
        AskResponse::Error { error } => panic!("unexpected error: {}", error),
    }

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("[1] chocolate.md"));
    assert!(prompt.contains("My dog ate chocolate. Is it dangerous?"));
}

#[tokio::test]
async fn unrelated_question_is_not_found_without_model_call() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 0.1);
    write_corpus(&config.corpus.documents_dir);
    let generator = Arc::new(ScriptedGenerator::default());

    let service = start(&config, generator.clone()).await;
    let answer = service
        .answer("What is the boiling point of mercury?", None)
        .await
        .unwrap();

    assert!(!answer.grounded);
    assert!(answer.text.starts_with(NOT_FOUND_SENTENCE));
    assert!(answer.text.ends_with(DISCLAIMER));
    assert!(answer.sources.is_empty());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn unrelated_question_is_not_found_when_model_sees_context() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 0.0);
    write_corpus(&config.corpus.documents_dir);
    let generator = Arc::new(ScriptedGenerator::default());

    let service = start(&config, generator.clone()).await;
    let answer = service
        .answer("What is the boiling point of mercury?", None)
        .await
        .unwrap();

    assert_eq!(generator.calls(), 1);
    assert!(!answer.grounded);
    assert!(answer.text.starts_with(NOT_FOUND_SENTENCE));
    assert!(answer.text.ends_with(DISCLAIMER));
}

#[tokio::test]
async fn emergency_question_gets_urgent_care_line() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 0.0);
    write_corpus(&config.corpus.documents_dir);
    let generator = Arc::new(ScriptedGenerator::default());

    let service = start(&config, generator.clone()).await;
    let answer = service
        .answer("My dog ate chocolate and is having a seizure", None)
        .await
        .unwrap();

    assert!(answer.emergency);
    assert!(answer.text.contains(URGENT_CARE_SENTENCE));
    assert!(answer.text.ends_with(DISCLAIMER));
    assert!(generator.last_prompt().unwrap().contains("possible emergency"));
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 0.0);
    write_corpus(&config.corpus.documents_dir);
    let generator = Arc::new(ScriptedGenerator::default());

    let service = start(&config, generator.clone()).await;
    let response = service.ask("   ", None).await;

    let json = serde_json::to_value(&response).unwrap();
    assert!(json["error"].as_str().unwrap().contains("Invalid question"));
    assert!(json.get("answer").is_none());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn empty_corpus_leaves_service_degraded() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 0.0);
    std::fs::create_dir_all(&config.corpus.documents_dir).unwrap();

    let service = start(&config, Arc::new(ScriptedGenerator::default())).await;
    let health = service.health().await;

    assert!(!health.initialized);
    assert!(health
        .last_error
        .as_deref()
        .unwrap()
        .contains("No documents loaded"));

    let response = service.ask("Is chocolate toxic?", None).await;
    assert!(response.is_error());
}
