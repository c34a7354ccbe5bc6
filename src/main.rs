//! vetrag CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vetrag::{
    commands::{
        cmd_ask, cmd_ingest, cmd_init, cmd_status, print_ask_response, print_build_report,
        print_init, print_status, IngestOptions,
    },
    config::{Config, IndexBackend},
    error::Result,
    progress::LogWriterFactory,
};

#[derive(Parser)]
#[command(name = "vetrag")]
#[command(version, about = "Grounded veterinary question answering over your own documents", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Load, chunk and index documents
    Ingest {
        /// Folder to scan (non-recursively) instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Individual file to ingest (repeatable)
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },

    /// Ask a question against the indexed documents
    Ask {
        /// The question
        question: String,

        /// Number of passages to retrieve
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Show service health
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let json_layer = cli
        .json
        .then(|| fmt::layer().json().with_writer(LogWriterFactory));
    let text_layer = (!cli.json).then(|| fmt::layer().with_writer(LogWriterFactory));

    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            let (base_dir, config_path) = init_paths(cli.config.as_deref());
            let report = cmd_init(base_dir, config_path, force)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_init(&report);
            }
        }

        Commands::Ingest { dir, files } => {
            let config = load_config(cli.config.as_deref())?;
            let report = cmd_ingest(&config, IngestOptions { dir, files }).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_build_report(&report, config.index.backend == IndexBackend::Qdrant);
            }
        }

        Commands::Ask { question, k } => {
            let config = load_config(cli.config.as_deref())?;
            let response = cmd_ask(&config, &question, k).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_ask_response(&response);
            }

            if response.is_error() {
                std::process::exit(1);
            }
        }

        Commands::Status => {
            let status = cmd_status(load_config(cli.config.as_deref())).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "vetrag", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Base directory and config file for `init`
///
/// A `.toml` path is used as the file; any other path is treated as a directory.
fn init_paths(path: Option<&Path>) -> (PathBuf, PathBuf) {
    match path {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => {
            let base = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_base_dir);
            (base, path.to_path_buf())
        }
        Some(dir) => (dir.to_path_buf(), dir.join("config.toml")),
        None => {
            let base = Config::default_base_dir();
            (base.clone(), base.join("config.toml"))
        }
    }
}

/// Load an explicit config file, or the default one falling back to built-in defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_from(None),
    }
}
