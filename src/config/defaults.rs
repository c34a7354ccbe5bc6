//! Default values for configuration

use std::path::PathBuf;

/// Default corpus folder, relative to the working directory
pub fn default_documents_dir() -> PathBuf {
    PathBuf::from("documents")
}

/// Default maximum characters per chunk
pub fn default_chunk_max_chars() -> usize {
    1000
}

/// Default overlap characters between chunks
pub fn default_chunk_overlap() -> usize {
    150
}

/// Default OpenAI-compatible API base URL
pub fn default_openai_base_url() -> String {
    std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com".to_string())
}

/// Default environment variable holding the OpenAI API key
pub fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Default embedding dimension (text-embedding-3-small, ada-002)
pub fn default_embedding_dimension() -> usize {
    1536
}

/// Default number of texts per embedding request
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default HTTP timeout for embedding requests in seconds
pub fn default_embedding_timeout() -> u64 {
    30
}

/// Default retries for embedding requests
pub fn default_embedding_retries() -> usize {
    2
}

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default environment variable name for Qdrant API key
pub fn default_qdrant_api_key_env() -> String {
    "QDRANT_API_KEY".to_string()
}

/// Default collection name
pub fn default_collection_name() -> String {
    "vetrag_docs".to_string()
}

/// Default chunks per remote write batch
pub fn default_index_batch_size() -> usize {
    100
}

/// Default upper bound on waiting for a new remote index (seconds)
pub fn default_ready_timeout() -> u64 {
    60
}

/// Default first poll interval while waiting for readiness (milliseconds)
pub fn default_ready_poll_interval() -> u64 {
    1000
}

/// Default timeout for a single index request (seconds)
pub fn default_index_request_timeout() -> u64 {
    30
}

/// Default: ingest the corpus when the service starts
pub fn default_ingest_on_startup() -> bool {
    true
}

/// Default number of passages retrieved per question
pub fn default_query_k() -> usize {
    4
}

/// Default minimum similarity score
pub fn default_query_min_score() -> f32 {
    0.0
}

/// Default generation model
pub fn default_generation_model() -> String {
    "gpt-4o".to_string()
}

/// Default sampling temperature
pub fn default_generation_temperature() -> f32 {
    0.0
}

/// Default HTTP timeout for generation requests in seconds
pub fn default_generation_timeout() -> u64 {
    120
}

/// Default retries for transient generation failures
pub fn default_generation_retries() -> u32 {
    2
}

/// Default answer language
pub fn default_answer_language() -> String {
    "English".to_string()
}
