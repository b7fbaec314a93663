//! Text-layer extraction: read the embedded text of each page.
//!
//! This is the fast path. No rendering happens here; the PDF's content
//! streams are parsed with `lopdf` and the strings shown by text operators
//! are collected per page.
//!
//! A page whose content stream never shows text (no `Tj`, `TJ`, `'` or `"`
//! operator) reports `None` rather than an empty string, so the classifier
//! can tell a scanned page from a page that is merely blank.
//!
//! Only the page's own content stream is inspected. Text drawn inside Form
//! XObjects (painted with `Do`) is not read, so a page that carries its text
//! only that way reports `None` and, if every page does, the document goes
//! to OCR.

use crate::document::{Page, SourceDocument};
use crate::error::Pdf2DocxError;
use lopdf::content::Content;
use lopdf::{Document as LopdfDocument, ObjectId};
use std::sync::Arc;
use tracing::debug;

/// Content-stream operators that paint text.
const TEXT_SHOWING_OPERATORS: [&str; 4] = ["Tj", "TJ", "'", "\""];

/// Opens the text layer of a PDF.
///
/// Implementations are blocking; the pipeline calls them from
/// `spawn_blocking`.
pub trait TextLayerBackend: Send + Sync {
    fn open(&self, source: &SourceDocument) -> Result<Box<dyn TextLayer>, Pdf2DocxError>;
}

/// An opened text layer, queried page by page.
pub trait TextLayer: Send {
    fn page_count(&self) -> usize;

    /// Text of page `index` (0-based), or `None` if the page has no text layer.
    fn page_text(&self, index: usize) -> Result<Option<String>, Pdf2DocxError>;
}

/// Pulls per-page text out of a document through a [`TextLayerBackend`].
#[derive(Clone)]
pub struct PageTextExtractor {
    backend: Arc<dyn TextLayerBackend>,
}

impl PageTextExtractor {
    pub fn new(backend: Arc<dyn TextLayerBackend>) -> Self {
        Self { backend }
    }

    /// Open the document's text layer.
    pub fn open(&self, source: &SourceDocument) -> Result<Box<dyn TextLayer>, Pdf2DocxError> {
        self.backend.open(source)
    }

    /// Extract every page, in file order.
    pub fn extract(&self, source: &SourceDocument) -> Result<Vec<Page>, Pdf2DocxError> {
        let layer = self.open(source)?;
        extract_pages(layer.as_ref())
    }
}

impl Default for PageTextExtractor {
    fn default() -> Self {
        Self::new(Arc::new(LopdfTextLayer))
    }
}

/// Read every page of an already opened text layer.
pub fn extract_pages(layer: &dyn TextLayer) -> Result<Vec<Page>, Pdf2DocxError> {
    (0..layer.page_count())
        .map(|index| Ok(Page::new(index, layer.page_text(index)?)))
        .collect()
}

/// [`TextLayerBackend`] built on the pure-Rust `lopdf` parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfTextLayer;

impl TextLayerBackend for LopdfTextLayer {
    fn open(&self, source: &SourceDocument) -> Result<Box<dyn TextLayer>, Pdf2DocxError> {
        let doc = LopdfDocument::load_mem(source.bytes()).map_err(|e| {
            Pdf2DocxError::DocumentOpen {
                name: source.name().to_string(),
                detail: e.to_string(),
            }
        })?;

        if doc.is_encrypted() {
            return Err(Pdf2DocxError::DocumentOpen {
                name: source.name().to_string(),
                detail: "document is encrypted".to_string(),
            });
        }

        // get_pages() is keyed by 1-based page number in ascending order.
        let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
        debug!("Text layer opened: {} pages", pages.len());

        Ok(Box::new(LopdfPages { doc, pages }))
    }
}

struct LopdfPages {
    doc: LopdfDocument,
    pages: Vec<(u32, ObjectId)>,
}

impl TextLayer for LopdfPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<Option<String>, Pdf2DocxError> {
        let (page_number, page_id) = *self.pages.get(index).ok_or_else(|| {
            Pdf2DocxError::TextLayer {
                page: index + 1,
                detail: format!("page index out of range (document has {} pages)", self.pages.len()),
            }
        })?;

        let text_error = |detail: String| Pdf2DocxError::TextLayer {
            page: index + 1,
            detail,
        };

        let raw = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| text_error(e.to_string()))?;
        let content = Content::decode(&raw).map_err(|e| text_error(e.to_string()))?;

        let shows_text = content
            .operations
            .iter()
            .any(|op| TEXT_SHOWING_OPERATORS.contains(&op.operator.as_str()));
        if !shows_text {
            if content.operations.iter().any(|op| op.operator == "Do") {
                debug!(
                    "Page {}: no text operators; XObjects painted with Do are not searched for text",
                    index + 1
                );
            } else {
                debug!("Page {}: no text operators", index + 1);
            }
            return Ok(None);
        }

        let text = self
            .doc
            .extract_text(&[page_number])
            .map_err(|e| text_error(e.to_string()))?;

        // lopdf terminates every text object with a newline.
        Ok(Some(text.trim_end().to_string()))
    }
}
