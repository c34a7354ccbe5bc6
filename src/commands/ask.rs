//! Ask command implementation

use crate::config::Config;
use crate::service::{AskResponse, RagService};
use tracing::info;

/// Start the service and answer one question
pub async fn cmd_ask(config: &Config, question: &str, k: Option<usize>) -> AskResponse {
    info!("Answering: {}", question);

    let service = RagService::initialize(config).await;
    service.ask(question, k).await
}

/// Print an answer or error to console
pub fn print_ask_response(response: &AskResponse) {
    match response {
        AskResponse::Answer { answer, sources } => {
            println!("\n{}\n", answer);
            if !sources.is_empty() {
                println!("📚 Sources:");
                for source in sources {
                    println!("  • {}", source);
                }
            }
        }
        AskResponse::Error { error } => {
            eprintln!("✗ {}", error);
        }
    }
}
