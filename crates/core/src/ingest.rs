use crate::error::{RagError, Result};
use crate::extractor::{extraction_error, is_supported};
use crate::models::IngestReport;
use crate::orchestrator::RagOrchestrator;
use crate::traits::{Embedder, Generator, TextExtractor, VectorStore};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
        .map(|entry| entry.path().to_path_buf())
        .collect::<Vec<_>>();

    files.sort_unstable();
    files
}

#[derive(Debug)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct PathIngestReport {
    pub documents: Vec<IngestReport>,
    pub skipped_files: Vec<SkippedDocument>,
}

impl PathIngestReport {
    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|report| report.chunk_count).sum()
    }
}

/// Ingests one file, or every supported file under a folder.
///
/// Files whose text cannot be extracted are skipped and reported; any
/// embedding or store failure aborts the whole run. Each document's source
/// id is its canonical path, so the same file reached through a different
/// spelling keeps the same chunk ids.
pub async fn ingest_path<E, S, G, X>(
    orchestrator: &RagOrchestrator<E, S, G>,
    extractor: &X,
    path: &Path,
) -> Result<PathIngestReport>
where
    E: Embedder,
    S: VectorStore,
    G: Generator,
    X: TextExtractor + Clone + Send + 'static,
{
    if path.is_file() {
        let source_id = canonical_source_id(path).await?;
        let text = extract_blocking(extractor, path).await?;
        let report = orchestrator.ingest_document(&source_id, &text).await?;
        return Ok(PathIngestReport {
            documents: vec![report],
            skipped_files: Vec::new(),
        });
    }

    let files = discover_documents(path);
    if files.is_empty() {
        return Err(RagError::Validation(format!(
            "no supported documents found in {}",
            path.display()
        )));
    }

    let mut result = PathIngestReport::default();
    for file in files {
        let extracted = match canonical_source_id(&file).await {
            Ok(source_id) => extract_blocking(extractor, &file)
                .await
                .map(|text| (source_id, text)),
            Err(error) => Err(error),
        };
        let (source_id, text) = match extracted {
            Ok(extracted) => extracted,
            Err(error @ RagError::Extraction { .. }) => {
                warn!(path = %file.display(), reason = %error, "skipping document");
                result.skipped_files.push(SkippedDocument {
                    path: file,
                    reason: error.to_string(),
                });
                continue;
            }
            Err(error) => return Err(error),
        };

        let report = orchestrator.ingest_document(&source_id, &text).await?;
        result.documents.push(report);
    }

    Ok(result)
}

async fn canonical_source_id(path: &Path) -> Result<String> {
    let canonical = tokio::fs::canonicalize(path)
        .await
        .map_err(|error| extraction_error(path, error.to_string()))?;
    Ok(canonical.to_string_lossy().into_owned())
}

/// PDF parsing is CPU bound; keep it on the blocking pool.
async fn extract_blocking<X>(extractor: &X, path: &Path) -> Result<String>
where
    X: TextExtractor + Clone + Send + 'static,
{
    let extractor = extractor.clone();
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || extractor.extract_text(&owned))
        .await
        .map_err(|error| extraction_error(path, error.to_string()))?
}
