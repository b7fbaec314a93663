//! Output-side data model: extraction results, the assembled document and
//! conversion statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the text of a document was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Text read from the PDF's embedded text layer.
    TextLayer,
    /// Text recovered by rasterising pages and running OCR.
    Ocr,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::TextLayer => f.write_str("text-layer"),
            Strategy::Ocr => f.write_str("ocr"),
        }
    }
}

/// Ordered per-page texts tagged with the strategy that produced them.
///
/// The strategy is fixed when the result is built and cannot be changed
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    strategy: Strategy,
    pages: Vec<String>,
}

impl ExtractionResult {
    /// Build a result from page texts already in ascending page order.
    pub fn new(strategy: Strategy, pages: Vec<String>) -> Self {
        Self { strategy, pages }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Page texts, index `i` holding page `i` of the source document.
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All page texts joined by a blank line, for logging and comparisons.
    pub fn full_text(&self) -> String {
        self.pages.join("\n\n")
    }
}

/// A serialised DOCX document.
#[derive(Clone, PartialEq, Eq)]
pub struct OutputDocument {
    /// The `.docx` container bytes.
    pub bytes: Vec<u8>,
    /// Strategy of the extraction the document was built from.
    pub strategy: Strategy,
    /// Text of every paragraph written, in document order.
    pub paragraphs: Vec<String>,
}

impl fmt::Debug for OutputDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputDocument")
            .field("bytes", &self.bytes.len())
            .field("strategy", &self.strategy)
            .field("paragraphs", &self.paragraphs.len())
            .finish()
    }
}

/// Aggregate statistics for a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub strategy: Strategy,
    /// Why OCR was chosen after a text-layer failure, if it was.
    pub fallback_reason: Option<String>,
    /// Pages that ended up with no text at all.
    pub empty_pages: usize,
    pub output_bytes: usize,
    pub classify_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub assemble_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a conversion produces.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub document: OutputDocument,
    pub extraction: ExtractionResult,
    pub stats: ConversionStats,
}
