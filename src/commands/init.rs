//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// What `init` wrote
#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub config_path: PathBuf,
    pub documents_dir: PathBuf,
    pub index_backend: String,
}

/// Write a default configuration file
pub fn cmd_init(base_dir: PathBuf, config_path: PathBuf, force: bool) -> Result<InitReport> {
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::with_base_dir(base_dir);
    config.paths.config_file = config_path.clone();
    config.save()?;

    info!("Initialized vetrag at {}", config_path.display());

    Ok(InitReport {
        config_path,
        documents_dir: config.corpus.documents_dir.clone(),
        index_backend: config.index.backend.to_string(),
    })
}

/// Print init result to console
pub fn print_init(report: &InitReport) {
    println!("✓ vetrag initialized successfully");
    println!("  Config: {}", report.config_path.display());
    println!("  Index backend: {}", report.index_backend);
    println!("\nNext steps:");
    println!(
        "  1. Put PDF, Word, text, Markdown, CSV, spreadsheet or HTML files in {}",
        report.documents_dir.display()
    );
    println!("  2. Export OPENAI_API_KEY (or the variables named in the config)");
    println!("  3. Ask a question: vetrag ask \"Is chocolate toxic to dogs?\"");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let report = cmd_init(dir.path().to_path_buf(), path.clone(), false).unwrap();
        assert_eq!(report.config_path, path);
        assert_eq!(report.index_backend, "local");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.chunk.max_chars, 1000);
        assert_eq!(config.chunk.overlap_chars, 150);
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# existing").unwrap();

        assert!(matches!(
            cmd_init(dir.path().to_path_buf(), path.clone(), false),
            Err(Error::Config(_))
        ));
        assert!(cmd_init(dir.path().to_path_buf(), path, true).is_ok());
    }
}
