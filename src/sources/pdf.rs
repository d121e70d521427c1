//! PDF text extraction boundary.

use std::sync::Arc;

use crate::error::EruditeError;

/// An opened document exposing page text. Pages are numbered from 1.
pub trait PdfDocument: Send {
    fn page_count(&self) -> usize;
    fn page_text(&self, page: usize) -> Result<String, EruditeError>;
}

/// Opens raw document bytes.
pub trait TextExtractor: Send + Sync {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, EruditeError>;

    /// Text of every page, in order, with no separator between pages.
    fn extract_text(&self, bytes: &[u8]) -> Result<String, EruditeError> {
        let doc = self.open(bytes)?;
        let mut text = String::new();
        for page in 1..=doc.page_count() {
            text.push_str(&doc.page_text(page)?);
        }
        Ok(text)
    }
}

/// Join a page's text items with single spaces.
pub fn join_items(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(feature = "pdf")]
mod lopdf_impl {
    use super::*;
    use lopdf::Document;

    /// Extractor backed by `lopdf`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct LopdfExtractor;

    struct LopdfDocument {
        doc: Document,
        pages: Vec<u32>,
    }

    impl PdfDocument for LopdfDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, page: usize) -> Result<String, EruditeError> {
            let number = page
                .checked_sub(1)
                .and_then(|idx| self.pages.get(idx))
                .ok_or_else(|| EruditeError::NotFound(format!("page {page}")))?;
            let raw = self
                .doc
                .extract_text(&[*number])
                .map_err(|e| EruditeError::Parse(e.to_string()))?;
            Ok(join_items(&raw))
        }
    }

    impl TextExtractor for LopdfExtractor {
        fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, EruditeError> {
            let doc = Document::load_mem(bytes).map_err(|e| EruditeError::Parse(e.to_string()))?;
            let pages = doc.get_pages().keys().copied().collect();
            Ok(Box::new(LopdfDocument { doc, pages }))
        }
    }
}

#[cfg(feature = "pdf")]
pub use lopdf_impl::LopdfExtractor;

/// Extractor used when the `pdf` feature is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedExtractor;

impl TextExtractor for UnsupportedExtractor {
    fn open(&self, _bytes: &[u8]) -> Result<Box<dyn PdfDocument>, EruditeError> {
        Err(EruditeError::Configuration(
            "PDF support is not enabled in this build".into(),
        ))
    }
}

/// The best extractor available in this build.
pub fn default_extractor() -> Arc<dyn TextExtractor> {
    #[cfg(feature = "pdf")]
    {
        Arc::new(LopdfExtractor)
    }
    #[cfg(not(feature = "pdf"))]
    {
        Arc::new(UnsupportedExtractor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeDoc(Vec<&'static str>);

    impl PdfDocument for FakeDoc {
        fn page_count(&self) -> usize {
            self.0.len()
        }
        fn page_text(&self, page: usize) -> Result<String, EruditeError> {
            Ok(join_items(self.0[page - 1]))
        }
    }

    struct FakeExtractor;

    impl TextExtractor for FakeExtractor {
        fn open(&self, _bytes: &[u8]) -> Result<Box<dyn PdfDocument>, EruditeError> {
            Ok(Box::new(FakeDoc(vec!["Deep\nLearning ", "Review\n"])))
        }
    }

    #[test]
    fn pages_concatenate_items_space_joined() {
        assert_eq!(FakeExtractor.extract_text(b"").unwrap(), "Deep LearningReview");
    }

    #[test]
    fn unsupported_extractor_errors() {
        assert!(UnsupportedExtractor.extract_text(b"%PDF").is_err());
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn lopdf_rejects_garbage() {
        assert!(matches!(
            LopdfExtractor.extract_text(b"not a pdf"),
            Err(EruditeError::Parse(_))
        ));
    }
}
