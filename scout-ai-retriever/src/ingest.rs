//! Context folder ingestion
//!
//! Reads every regular file directly inside a folder, in name order, and turns
//! the texts into a [`Corpus`]. Unreadable files are logged and skipped so one
//! bad document never stops ingestion.
//!
//! PDF files are extracted with `pdf-extract` when the `pdf` feature is enabled
//! and skipped otherwise. Everything else is decoded as UTF-8, replacing
//! invalid bytes.

use crate::storage::FragmentStore;
use anyhow::{Context, Result};
use scout_ai_context::{Chunker, Fragment};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extracted text of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub name: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// The text wrapped in begin/end markers naming the file.
    pub fn delimited(&self) -> String {
        format!(
            "--- BEGIN FILE: {name} ---\n{text}\n--- END FILE: {name} ---\n\n",
            name = self.name,
            text = self.text
        )
    }
}

/// A file that was left out of the corpus, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    pub documents: Vec<SourceDocument>,
    pub skipped: Vec<SkippedFile>,
}

impl Corpus {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All documents as one text blob, each wrapped in file markers.
    pub fn concatenated(&self) -> String {
        self.documents.iter().map(SourceDocument::delimited).collect()
    }
}

/// How ingested documents are cut into fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChunkScope {
    /// Chunk the concatenated corpus as one text
    #[default]
    Corpus,
    /// Chunk each document separately, tagging fragments with the file name
    PerDocument,
}

/// Builds a fragment store from `corpus`.
pub fn build_store(corpus: &Corpus, chunker: &Chunker, scope: ChunkScope) -> FragmentStore {
    match scope {
        ChunkScope::Corpus => FragmentStore::from_text(chunker, &corpus.concatenated()),
        ChunkScope::PerDocument => {
            let fragments: Vec<Fragment> = corpus
                .documents
                .iter()
                .flat_map(|doc| chunker.chunk_document(&doc.text, Some(&doc.name)))
                .collect();
            FragmentStore::new(fragments)
        }
    }
}

/// Whether a file in the context folder should be read at all.
pub fn should_ingest_file(path: &Path) -> bool {
    if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
        if filename.starts_with('.') {
            return false;
        }
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    !matches!(
        extension.as_deref(),
        Some(
            "exe" | "dll" | "so" | "dylib" | "bin" | "png" | "jpg" | "jpeg" | "gif" | "ico"
                | "wasm" | "zip" | "gz" | "lock"
        )
    )
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(feature = "pdf")]
async fn read_pdf(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .context("PDF extraction task failed")?
        .map_err(|e| anyhow::anyhow!("Failed to extract text from {}: {e}", path.display()))
}

#[cfg(not(feature = "pdf"))]
async fn read_pdf(path: &Path) -> Result<String> {
    anyhow::bail!(
        "{} is a PDF but PDF support is not compiled in (enable the `pdf` feature)",
        path.display()
    )
}

/// Extracts the text of one file.
pub async fn read_document(path: &Path) -> Result<String> {
    if is_pdf(path) {
        return read_pdf(path).await;
    }
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads every ingestible file directly inside `dir`, sorted by file name.
///
/// A missing folder is an error; an empty one yields an empty corpus.
pub async fn read_context_dir(dir: &Path) -> Result<Corpus> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Context folder {} cannot be read", dir.display()))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?
    {
        paths.push(entry.path());
    }
    paths.sort();

    let mut corpus = Corpus::default();
    for path in paths {
        let is_file = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.is_file(),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                corpus.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if !is_file || !should_ingest_file(&path) {
            debug!("Ignoring {}", path.display());
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match read_document(&path).await {
            Ok(text) if text.trim().is_empty() => {
                debug!("Skipping {}: no text", path.display());
                corpus.skipped.push(SkippedFile {
                    path,
                    reason: "no text content".to_string(),
                });
            }
            Ok(text) => {
                debug!("Read {} ({} bytes)", name, text.len());
                corpus.documents.push(SourceDocument::new(name, text));
            }
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                corpus.skipped.push(SkippedFile {
                    path,
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    info!(
        "Read {} documents from {} ({} skipped)",
        corpus.documents.len(),
        dir.display(),
        corpus.skipped.len()
    );
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_delimited_document() {
        let doc = SourceDocument::new("rules.txt", "Be prepared.");
        assert_eq!(
            doc.delimited(),
            "--- BEGIN FILE: rules.txt ---\nBe prepared.\n--- END FILE: rules.txt ---\n\n"
        );
    }

    #[test]
    fn test_should_ingest_file() {
        assert!(should_ingest_file(Path::new("notes.md")));
        assert!(should_ingest_file(Path::new("handbook.pdf")));
        assert!(should_ingest_file(Path::new("README")));
        assert!(!should_ingest_file(Path::new(".DS_Store")));
        assert!(!should_ingest_file(Path::new("logo.PNG")));
        assert!(!should_ingest_file(Path::new("Cargo.lock")));
    }

    #[tokio::test]
    async fn test_read_context_dir_sorted_and_recovering() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("b.txt"), "second").unwrap();
        std::fs::write(dir.join("a.md"), "first").unwrap();
        std::fs::write(dir.join("blank.txt"), "  \n ").unwrap();
        std::fs::write(dir.join(".hidden"), "secret").unwrap();
        std::fs::write(dir.join("latin1.txt"), [b'c', b'a', b'f', 0xE9]).unwrap();
        std::fs::create_dir(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested/c.txt"), "ignored").unwrap();

        let corpus = read_context_dir(dir).await.unwrap();
        let names: Vec<&str> = corpus.documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.txt", "latin1.txt"]);
        assert_eq!(corpus.documents[2].text, "caf\u{FFFD}");
        assert_eq!(corpus.skipped.len(), 1);
        assert!(corpus.skipped[0].path.ends_with("blank.txt"));
    }

    #[cfg(not(feature = "pdf"))]
    #[tokio::test]
    async fn test_pdf_skipped_without_feature() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("guide.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "kept").unwrap();

        let corpus = read_context_dir(temp_dir.path()).await.unwrap();
        assert_eq!(corpus.documents.len(), 1);
        assert!(corpus.skipped[0].reason.contains("pdf"));
    }

    /// A one-page PDF showing `text` in Helvetica.
    #[cfg(feature = "pdf")]
    fn single_page_pdf(text: &str) -> Vec<u8> {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>"
                .to_string(),
            format!(
                "<< /Length {} >>\nstream\n{content}\nendstream",
                content.len()
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend(format!("{} 0 obj\n{body}\nendobj\n", i + 1).into_bytes());
        }
        let xref = pdf.len();
        pdf.extend(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).into_bytes());
        for offset in offsets {
            pdf.extend(format!("{offset:010} 00000 n \n").into_bytes());
        }
        pdf.extend(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                objects.len() + 1
            )
            .into_bytes(),
        );
        pdf
    }

    #[cfg(feature = "pdf")]
    #[tokio::test]
    async fn test_pdf_text_is_extracted() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("guide.pdf"),
            single_page_pdf("Be prepared for the hike"),
        )
        .unwrap();

        let corpus = read_context_dir(temp_dir.path()).await.unwrap();
        assert!(corpus.skipped.is_empty(), "{:?}", corpus.skipped);
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(corpus.documents[0].name, "guide.pdf");
        assert!(corpus.documents[0].text.contains("Be prepared for the hike"));
    }

    #[cfg(feature = "pdf")]
    #[tokio::test]
    async fn test_corrupt_pdf_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("broken.pdf"), b"%PDF-1.4 truncated").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "kept").unwrap();

        let corpus = read_context_dir(temp_dir.path()).await.unwrap();
        assert_eq!(corpus.documents.len(), 1);
        assert!(corpus.skipped[0].path.ends_with("broken.pdf"));
    }

    #[tokio::test]
    async fn test_missing_dir_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_context_dir(&temp_dir.path().join("absent")).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_dir_is_empty_corpus() {
        let temp_dir = TempDir::new().unwrap();
        let corpus = read_context_dir(temp_dir.path()).await.unwrap();
        assert!(corpus.is_empty());
        assert_eq!(corpus.concatenated(), "");
    }

    #[test]
    fn test_build_store_scopes() {
        let corpus = Corpus {
            documents: vec![
                SourceDocument::new("a.txt", "abcdef"),
                SourceDocument::new("b.txt", "xyz"),
            ],
            skipped: vec![],
        };
        let chunker = Chunker::new(4, 0).unwrap();

        let per_doc = build_store(&corpus, &chunker, ChunkScope::PerDocument);
        let texts: Vec<&str> = per_doc.iter().map(|f| f.text()).collect();
        assert_eq!(texts, vec!["abcd", "ef", "xyz"]);
        assert_eq!(per_doc.get(2).and_then(|f| f.document()), Some("b.txt"));

        let whole = build_store(&corpus, &chunker, ChunkScope::Corpus);
        assert!(whole.get(0).is_some_and(|f| f.text() == "--- "));
        assert!(whole.iter().all(|f| f.document().is_none()));
    }
}
