//! Custom error types for vetrag

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for vetrag operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Qdrant error: {0}")]
    Qdrant(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No documents loaded. Add supported files to the documents folder")]
    EmptyCorpus,

    #[error("Index '{index}' not ready after {waited:?}")]
    BackendNotReady { index: String, waited: Duration },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("RAG system is not initialized: {0}")]
    NotInitialized(String),

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),
}

impl Error {
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether a retry of the same request could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status()
                        .map(|s| s.as_u16() == 429 || s.is_server_error())
                        .unwrap_or(false)
            }
            Error::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Result type alias for vetrag
pub type Result<T> = std::result::Result<T, Error>;

/// Convert qdrant errors
impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::Qdrant(err.to_string())
    }
}

/// Shorten an error message for summaries and log lines
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        return message.to_string();
    }
    let mut truncated: String = message.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short", 10), "short");
        assert_eq!(truncate_message("abcdefghij", 4), "abcd…");
        // Multi-byte characters are counted, not bytes
        assert_eq!(truncate_message("초콜릿은 위험", 3), "초콜릿…");
    }

    #[test]
    fn test_retryable_classification() {
        let timeout = Error::Timeout {
            operation: "generation".to_string(),
            after: Duration::from_secs(1),
        };
        assert!(timeout.is_retryable());
        assert!(!Error::EmptyCorpus.is_retryable());
        assert!(!Error::Config("missing key".to_string()).is_retryable());
    }
}
