//! vetrag - grounded question answering over a private document corpus
//!
//! This crate provides:
//! - Loaders for PDF, Word, text, Markdown, CSV, spreadsheet and HTML files
//! - Chunking, embedding and batched writes to a local or Qdrant vector index
//! - Retrieval and answer synthesis under a grounding-and-safety prompt
//! - A `RagService` handle plus CLI commands built on it

pub mod answer;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod progress;
pub mod retrieve;
pub mod service;

pub use config::Config;
pub use error::{Error, Result};
pub use service::{AskResponse, RagService};
