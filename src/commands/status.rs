//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::service::{Health, RagService};
use serde::Serialize;
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: Option<String>,
    pub index_backend: Option<String>,
    pub collection_name: Option<String>,
    pub embedding_model: Option<String>,
    pub generation_model: Option<String>,
    pub health: Health,
}

/// Initialize the service and report its health
///
/// A configuration that fails to load is reported as a degraded service.
pub async fn cmd_status(config: Result<Config>) -> StatusInfo {
    info!("Getting status");

    match config {
        Ok(config) => {
            let service = RagService::initialize(&config).await;
            StatusInfo {
                config_path: Some(config.paths.config_file.display().to_string()),
                index_backend: Some(config.index.backend.to_string()),
                collection_name: Some(config.index.collection_name.clone()),
                embedding_model: Some(config.embedding.model.clone()),
                generation_model: Some(config.generation.model.clone()),
                health: service.health().await,
            }
        }
        Err(e) => StatusInfo {
            config_path: None,
            index_backend: None,
            collection_name: None,
            embedding_model: None,
            generation_model: None,
            health: RagService::degraded(e).health().await,
        },
    }
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 vetrag Status\n");

    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    println!("Configuration: {}", show(&status.config_path));
    println!("\nIndex:");
    println!("  Backend: {}", show(&status.index_backend));
    println!("  Collection: {}", show(&status.collection_name));
    if let Some(count) = status.health.indexed_vectors {
        println!("  Vectors: {}", count);
    }
    println!("\nEmbedding Model: {}", show(&status.embedding_model));
    println!("Generation Model: {}", show(&status.generation_model));

    let state = if status.health.initialized {
        "✓ Ready".to_string()
    } else {
        format!(
            "✗ Not initialized: {}",
            status.health.last_error.as_deref().unwrap_or("unknown error")
        )
    };
    println!("\nService: {}", state);
}
