//! Corpus ingestion
//!
//! Resolves explicit files and a non-recursively scanned folder into a
//! sorted list of paths, loads each one through the format dispatcher and
//! records what happened per file. One bad file never stops the run; only
//! an empty result does.

use crate::config::CorpusConfig;
use crate::error::{truncate_message, Error, Result};
use crate::loader::{select_loader, DocumentFormat, DocumentLoader, LoaderSelection, RawDocument};
use ignore::WalkBuilder;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Failures listed in the summary
const SUMMARY_FAILURE_LIMIT: usize = 5;

/// Longest error message kept per failed file
const FAILURE_MESSAGE_CHARS: usize = 200;

/// Where to look for documents
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    /// Individual files
    pub files: Vec<PathBuf>,
    /// Folder scanned one level deep
    pub dir: Option<PathBuf>,
}

impl IngestRequest {
    pub fn from_config(config: &CorpusConfig) -> Self {
        Self {
            files: config.files.clone(),
            dir: Some(config.documents_dir.clone()),
        }
    }

    pub fn dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            files: Vec::new(),
            dir: Some(dir.into()),
        }
    }
}

/// What happened to one input path
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Loaded { format: DocumentFormat, pages: usize, chars: usize },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Loaded documents plus the per-file record of the run
#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: Vec<RawDocument>,
    pub outcomes: Vec<FileOutcome>,
}

/// Serializable overview of an [`IngestReport`]
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// First few failing files with their reasons
    pub failures: Vec<FailureNote>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureNote {
    pub file: String,
    pub reason: String,
}

impl IngestReport {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Loaded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped { .. }))
    }

    fn count(&self, predicate: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }

    pub fn summary(&self) -> IngestSummary {
        let failures = self
            .outcomes
            .iter()
            .filter_map(|o| match &o.status {
                FileStatus::Failed { error } => Some(FailureNote {
                    file: file_label(&o.path),
                    reason: error.clone(),
                }),
                _ => None,
            })
            .take(SUMMARY_FAILURE_LIMIT)
            .collect();

        IngestSummary {
            succeeded: self.succeeded(),
            failed: self.failed(),
            skipped: self.skipped(),
            failures,
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Collect candidate files in sorted order, deduplicated
///
/// Missing explicit files are kept so the loader step can report them.
pub fn resolve_paths(request: &IngestRequest) -> Vec<PathBuf> {
    let mut paths: BTreeSet<PathBuf> = request.files.iter().cloned().collect();

    if let Some(dir) = &request.dir {
        if dir.is_dir() {
            let walker = WalkBuilder::new(dir)
                .max_depth(Some(1))
                .standard_filters(false)
                .follow_links(true)
                .build();

            for entry in walker {
                match entry {
                    Ok(e) if e.depth() == 0 => {}
                    Ok(e) if e.path().is_file() => {
                        paths.insert(e.into_path());
                    }
                    Ok(e) => warn!(
                        "Not a regular file (subfolders are not scanned), skipping: {}",
                        e.path().display()
                    ),
                    Err(e) => warn!("Could not read entry in {}: {}", dir.display(), e),
                }
            }
        } else {
            warn!("Documents folder {} does not exist, skipping", dir.display());
        }
    }

    paths.into_iter().collect()
}

/// Load one path into a document, or say why it was not loaded
pub fn load_file(path: &Path) -> (FileStatus, Option<RawDocument>) {
    if !path.is_file() {
        warn!("File not found, skipping: {}", path.display());
        return (
            FileStatus::Skipped {
                reason: "file not found".to_string(),
            },
            None,
        );
    }

    let loader = match select_loader(path) {
        LoaderSelection::Supported(loader) => loader,
        LoaderSelection::Unsupported { extension } => {
            warn!("Unsupported file type '{}', skipping: {}", extension, path.display());
            return (
                FileStatus::Skipped {
                    reason: format!("unsupported extension '{}'", extension),
                },
                None,
            );
        }
    };

    load_with(loader, path)
}

/// Run one loader on `path`; a panicking parser counts as a failed file
pub fn load_with(loader: &dyn DocumentLoader, path: &Path) -> (FileStatus, Option<RawDocument>) {
    let format = loader.format();
    let loaded = panic::catch_unwind(AssertUnwindSafe(|| loader.load(path)))
        .unwrap_or_else(|payload| Err(Error::parse(path, panic_message(payload.as_ref()))));

    let pages = match loaded {
        Ok(pages) => pages,
        Err(e) => {
            let error = match e {
                Error::Parse { message, .. } => message,
                other => other.to_string(),
            };
            warn!("Failed to load {}: {}", path.display(), error);
            return (
                FileStatus::Failed {
                    error: truncate_message(&error, FAILURE_MESSAGE_CHARS),
                },
                None,
            );
        }
    };

    let pages: Vec<_> = pages
        .into_iter()
        .filter(|p| !p.text.trim().is_empty())
        .collect();
    if pages.is_empty() {
        warn!("No text extracted from {}", path.display());
        return (
            FileStatus::Failed {
                error: "no extractable text".to_string(),
            },
            None,
        );
    }

    let document = RawDocument {
        source: path.to_path_buf(),
        format,
        pages,
    };
    debug!(
        "Loaded {} ({}, {} pages, {} chars)",
        path.display(),
        format,
        document.pages.len(),
        document.char_count()
    );

    (
        FileStatus::Loaded {
            format,
            pages: document.pages.len(),
            chars: document.char_count(),
        },
        Some(document),
    )
}

/// Text of a parser panic, for the failure record
fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("parser panicked: {}", detail)
}

/// Load every resolvable document; fails only when nothing could be loaded
pub fn ingest(request: &IngestRequest) -> Result<IngestReport> {
    let paths = resolve_paths(request);
    info!("Found {} candidate files", paths.len());

    let mut report = IngestReport::default();
    for path in paths {
        let (status, document) = load_file(&path);
        report.documents.extend(document);
        report.outcomes.push(FileOutcome { path, status });
    }

    let summary = report.summary();
    info!(
        "Ingestion finished: {} loaded, {} failed, {} skipped",
        summary.succeeded, summary.failed, summary.skipped
    );
    for failure in &summary.failures {
        warn!("  {}: {}", failure.file, failure.reason);
    }

    if report.documents.is_empty() {
        return Err(Error::EmptyCorpus);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_one_valid_one_corrupt() {
        let dir = TempDir::new().unwrap();
        write(&dir, "chocolate.md", b"# Chocolate\n\nTheobromine is toxic to dogs.");
        write(&dir, "broken.docx", b"this is not a zip archive");

        let report = ingest(&IngestRequest::dir(dir.path())).unwrap();

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].format, DocumentFormat::Markdown);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 1);

        let summary = report.summary();
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].file, "broken.docx");
    }

    #[test]
    fn test_empty_corpus() {
        let dir = TempDir::new().unwrap();
        write(&dir, "image.png", b"\x89PNG\r\n");

        let err = ingest(&IngestRequest::dir(dir.path())).unwrap_err();
        assert!(matches!(err, Error::EmptyCorpus));

        let empty = TempDir::new().unwrap();
        assert!(matches!(
            ingest(&IngestRequest::dir(empty.path())),
            Err(Error::EmptyCorpus)
        ));
    }

    #[test]
    fn test_unsupported_and_missing_are_skipped() {
        let dir = TempDir::new().unwrap();
        let text = write(&dir, "notes.txt", b"Xylitol causes hypoglycemia.");
        write(&dir, "photo.jpg", b"\xff\xd8\xff");

        let request = IngestRequest {
            files: vec![dir.path().join("missing.pdf")],
            dir: Some(dir.path().to_path_buf()),
        };
        let report = ingest(&request).unwrap();

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].source, text);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.failed(), 0);
    }

    #[test]
    fn test_scan_is_sorted_and_not_recursive() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.txt", b"second");
        write(&dir, "a.txt", b"first");
        write(&dir, ".hidden.txt", b"hidden");
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), b"deep").unwrap();

        let paths = resolve_paths(&IngestRequest::dir(dir.path()));
        let names: Vec<_> = paths.iter().map(|p| file_label(p)).collect();
        assert_eq!(names, vec![".hidden.txt", "a.txt", "b.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_documents_are_loaded() {
        let storage = TempDir::new().unwrap();
        let target = write(&storage, "real.txt", b"Onions damage canine red blood cells.");

        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("linked.txt")).unwrap();
        write(&dir, ".dosing.txt", b"Meloxicam is given once daily.");

        let report = ingest(&IngestRequest::dir(dir.path())).unwrap();
        let names: Vec<_> = report
            .documents
            .iter()
            .map(|d| file_label(&d.source))
            .collect();
        assert_eq!(names, vec![".dosing.txt", "linked.txt"]);
    }

    struct PanickingLoader;

    impl DocumentLoader for PanickingLoader {
        fn format(&self) -> DocumentFormat {
            DocumentFormat::Pdf
        }

        fn load(&self, _path: &Path) -> Result<Vec<crate::loader::RawPage>> {
            panic!("malformed cross-reference table");
        }
    }

    #[test]
    fn test_parser_panic_is_recorded_as_failure() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "scan.pdf", b"%PDF-1.4 truncated");

        let (status, document) = load_with(&PanickingLoader, &path);

        assert!(document.is_none());
        match status {
            FileStatus::Failed { error } => {
                assert!(error.contains("parser panicked"));
                assert!(error.contains("malformed cross-reference table"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_file_and_folder_deduplicate() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", b"first");

        let request = IngestRequest {
            files: vec![a.clone()],
            dir: Some(dir.path().to_path_buf()),
        };
        assert_eq!(resolve_paths(&request), vec![a]);
    }

    #[test]
    fn test_summary_lists_at_most_five_failures() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ok.txt", b"valid text");
        for i in 0..7 {
            write(&dir, &format!("bad{}.docx", i), b"garbage");
        }

        let report = ingest(&IngestRequest::dir(dir.path())).unwrap();
        let summary = report.summary();
        assert_eq!(summary.failed, 7);
        assert_eq!(summary.failures.len(), 5);
        assert_eq!(summary.failures[0].file, "bad0.docx");
    }
}
