//! Text presence classification: does this PDF need OCR?
//!
//! The decision is made once per document. A single page with recoverable
//! text is enough to pick the text layer for every page; pages without text
//! then simply contribute an empty paragraph. The probe stops at the first
//! page with text and never touches the OCR backends.

use crate::document::SourceDocument;
use crate::error::Pdf2DocxError;
use crate::pipeline::text_layer::{PageTextExtractor, TextLayer};
use std::fmt;
use tracing::debug;

/// Outcome of probing a document's text layer.
pub enum Classification {
    /// At least one page carries text. The opened layer is handed on so
    /// extraction does not parse the file a second time.
    TextBearing {
        layer: Box<dyn TextLayer>,
        /// 0-based index of the first page found with text.
        first_text_page: usize,
    },
    /// Every page is absent or blank.
    ImageOnly { page_count: usize },
    /// The probe itself failed; the caller decides whether to fall back.
    Unreadable(Pdf2DocxError),
}

impl fmt::Debug for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::TextBearing {
                layer,
                first_text_page,
            } => f
                .debug_struct("TextBearing")
                .field("page_count", &layer.page_count())
                .field("first_text_page", first_text_page)
                .finish(),
            Classification::ImageOnly { page_count } => f
                .debug_struct("ImageOnly")
                .field("page_count", page_count)
                .finish(),
            Classification::Unreadable(e) => f.debug_tuple("Unreadable").field(e).finish(),
        }
    }
}

/// Decides between the text-layer and OCR strategies.
#[derive(Clone, Default)]
pub struct TextPresenceClassifier {
    extractor: PageTextExtractor,
}

impl TextPresenceClassifier {
    pub fn new(extractor: PageTextExtractor) -> Self {
        Self { extractor }
    }

    /// True if at least one page yields non-empty text.
    pub fn has_extractable_text(&self, source: &SourceDocument) -> Result<bool, Pdf2DocxError> {
        match self.classify(source) {
            Classification::TextBearing { .. } => Ok(true),
            Classification::ImageOnly { .. } => Ok(false),
            Classification::Unreadable(e) => Err(e),
        }
    }

    /// Probe the document and return the tagged outcome.
    pub fn classify(&self, source: &SourceDocument) -> Classification {
        let layer = match self.extractor.open(source) {
            Ok(layer) => layer,
            Err(e) => return Classification::Unreadable(e),
        };

        let page_count = layer.page_count();
        for index in 0..page_count {
            match layer.page_text(index) {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    debug!("Page {} has text; stopping probe", index + 1);
                    return Classification::TextBearing {
                        layer,
                        first_text_page: index,
                    };
                }
                Ok(_) => {}
                Err(e) => return Classification::Unreadable(e),
            }
        }

        Classification::ImageOnly { page_count }
    }
}
