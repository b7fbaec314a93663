//! Input-side data model: the source PDF and its pages.

use crate::error::Pdf2DocxError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Magic bytes every PDF file starts with.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The input PDF: an immutable byte buffer plus the name it arrived under.
///
/// Cloning is cheap (the bytes sit behind an `Arc`), which lets concurrent
/// OCR page workers share one buffer read-only.
#[derive(Clone)]
pub struct SourceDocument {
    name: String,
    bytes: Arc<[u8]>,
}

impl SourceDocument {
    /// Wrap a byte buffer, rejecting anything that does not start with `%PDF`.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self, Pdf2DocxError> {
        let name = name.into();
        let bytes = bytes.into();
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(Pdf2DocxError::NotAPdf {
                magic: bytes.iter().take(4).copied().collect(),
                name,
            });
        }
        Ok(Self { name, bytes })
    }

    /// The name the document arrived under (file name, URL segment or upload name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw PDF bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the PDF in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Filename to offer for the converted document.
    pub fn suggested_output_name(&self) -> String {
        suggested_output_name(&self.name)
    }
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Replace the input file's extension with `.docx`.
///
/// Only the final path component is kept, so upload names carrying client
/// directories never leak into the download name.
///
/// ```rust
/// use pdf2docx::document::suggested_output_name;
///
/// assert_eq!(suggested_output_name("report.pdf"), "report.docx");
/// assert_eq!(suggested_output_name("scans/2024.03.PDF"), "2024.03.docx");
/// assert_eq!(suggested_output_name(""), "document.docx");
/// ```
pub fn suggested_output_name(input_name: &str) -> String {
    let file_name = input_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(input_name);
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("{stem}.docx")
}

/// One page of the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 0-based position in the source document.
    pub index: usize,
    /// Text recovered from the page's text layer.
    ///
    /// `None` means the page carries no text layer at all; `Some("")` means
    /// it has one but nothing in it.
    pub text: Option<String>,
}

impl Page {
    pub fn new(index: usize, text: Option<String>) -> Self {
        Self { index, text }
    }

    /// Whether the page contributes any visible text.
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}
