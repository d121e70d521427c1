//! Paper sources: search-result abstracts, PDF files, and pasted text.

pub mod pdf;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{EruditeError, Result};
use crate::types::PaperMetadata;

pub use pdf::{default_extractor, PdfDocument, TextExtractor};
#[cfg(feature = "pdf")]
pub use pdf::LopdfExtractor;

/// Anything a note can be generated from.
///
/// `key` must stay stable for the source's lifetime; it is how existing
/// notes are matched back to their source.
#[async_trait]
pub trait PaperSource: Send + Sync {
    fn key(&self) -> &str;

    fn name(&self) -> &str;

    /// Whether the content is only an abstract rather than full text.
    fn is_abstract(&self) -> bool {
        false
    }

    /// Read the content. Not cached: each call reads again.
    async fn get_content(&self) -> Result<String>;
}

/// A search result, analysed from its abstract.
#[derive(Debug, Clone)]
pub struct AbstractSource {
    key: String,
    paper: PaperMetadata,
}

impl AbstractSource {
    /// `index` is the paper's position in the result list.
    pub fn new(paper: PaperMetadata, index: usize) -> Self {
        Self {
            key: format!("{}{}", paper.title, index),
            paper,
        }
    }

    /// One source per result, keyed by position.
    pub fn from_results(papers: &[PaperMetadata]) -> Vec<Self> {
        papers
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, p)| Self::new(p, i))
            .collect()
    }

    pub fn paper(&self) -> &PaperMetadata {
        &self.paper
    }
}

#[async_trait]
impl PaperSource for AbstractSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn name(&self) -> &str {
        &self.paper.title
    }

    fn is_abstract(&self) -> bool {
        true
    }

    async fn get_content(&self) -> Result<String> {
        Ok(format!(
            "Title: {}\nAuthors: {}\nAbstract: {}",
            self.paper.title,
            self.paper.authors.join(", "),
            self.paper.abstract_text
        ))
    }
}

/// A PDF on disk.
#[derive(Clone)]
pub struct FileSource {
    key: String,
    name: String,
    path: PathBuf,
    extractor: Arc<dyn TextExtractor>,
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("key", &self.key)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileSource {
    /// Key is the file name followed by its modification time in milliseconds.
    pub fn open(path: impl AsRef<Path>, extractor: Arc<dyn TextExtractor>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| EruditeError::InvalidArgument(format!("not a file: {}", path.display())))?;
        let modified = std::fs::metadata(&path)?
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Ok(Self {
            key: format!("{name}{modified}"),
            name,
            path,
            extractor,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PaperSource for FileSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn get_content(&self) -> Result<String> {
        let bytes = tokio::fs::read(&self.path).await?;
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|e| EruditeError::Parse(format!("extraction task failed: {e}")))?
    }
}

/// Text pasted by the user.
#[derive(Debug, Clone)]
pub struct PastedSource {
    key: String,
    name: String,
    content: String,
}

impl PastedSource {
    /// `position` is 1-based among non-empty pasted papers; a blank name
    /// becomes `Pasted Paper {position}`.
    pub fn new(id: i64, name: &str, content: impl Into<String>, position: usize) -> Self {
        let name = match name.trim() {
            "" => format!("Pasted Paper {position}"),
            trimmed => trimmed.to_string(),
        };
        Self {
            key: id.to_string(),
            name,
            content: content.into(),
        }
    }

    /// Build sources from `(id, name, content)` triples, skipping blank content.
    pub fn collect<'a>(pasted: impl IntoIterator<Item = (i64, &'a str, &'a str)>) -> Vec<Self> {
        pasted
            .into_iter()
            .filter(|(_, _, content)| !content.trim().is_empty())
            .enumerate()
            .map(|(i, (id, name, content))| Self::new(id, name, content, i + 1))
            .collect()
    }
}

#[async_trait]
impl PaperSource for PastedSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn get_content(&self) -> Result<String> {
        Ok(self.content.clone())
    }
}
