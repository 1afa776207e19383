use crate::error::{RagError, Result};
use crate::traits::TextExtractor;
use lopdf::Document;
use std::fs;
use std::path::Path;

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// Plain text for PDFs (via lopdf) and UTF-8 text or markdown files.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let text = match extension(path).as_deref() {
            Some("pdf") => extract_pdf(path)?,
            Some("txt" | "md") => fs::read_to_string(path)
                .map_err(|error| extraction_error(path, error.to_string()))?,
            _ => {
                return Err(extraction_error(path, "unsupported file type".to_string()));
            }
        };

        if text.trim().is_empty() {
            return Err(extraction_error(path, "no readable text".to_string()));
        }

        Ok(text)
    }
}

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn extract_pdf(path: &Path) -> Result<String> {
    let document =
        Document::load(path).map_err(|error| extraction_error(path, error.to_string()))?;

    let mut pages = Vec::new();
    for page_no in document.get_pages().keys() {
        let text = document
            .extract_text(&[*page_no])
            .map_err(|error| extraction_error(path, error.to_string()))?;
        if !text.trim().is_empty() {
            pages.push(text);
        }
    }

    Ok(pages.join("\n"))
}

pub(crate) fn extraction_error(path: &Path, reason: String) -> RagError {
    RagError::Extraction {
        path: path.display().to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_text_files() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.TXT");
        fs::write(&path, "Revenue grew 10%.\nDebt decreased.")?;

        let text = DocumentExtractor.extract_text(&path)?;
        assert_eq!(text, "Revenue grew 10%.\nDebt decreased.");
        Ok(())
    }

    #[test]
    fn empty_file_is_an_extraction_error() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.md");
        fs::write(&path, "  \n")?;

        let error = DocumentExtractor
            .extract_text(&path)
            .expect_err("blank file has no text");
        assert!(matches!(error, RagError::Extraction { .. }));
        Ok(())
    }

    #[test]
    fn broken_pdf_is_an_extraction_error() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let error = DocumentExtractor
            .extract_text(&path)
            .expect_err("pdf is unreadable");
        match error {
            RagError::Extraction { path: reported, .. } => {
                assert!(reported.ends_with("broken.pdf"));
            }
            other => panic!("expected extraction error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let path = Path::new("figures.xlsx");
        assert!(!is_supported(path));
        assert!(matches!(
            DocumentExtractor.extract_text(path),
            Err(RagError::Extraction { .. })
        ));
        assert!(is_supported(Path::new("report.PDF")));
    }
}
