//! Error types for the pdf2docx library.
//!
//! A single enum, [`Pdf2DocxError`], covers every failure the pipeline can
//! report. Variants fall into three groups:
//!
//! * **Client input** — the bytes are not a PDF, the file is missing, the
//!   URL cannot be fetched, or the PDF container cannot be opened. These map
//!   to a 4xx response in the upload server (see
//!   [`Pdf2DocxError::is_client_error`]).
//!
//! * **Recoverable** — anything raised while probing or reading the text
//!   layer, typically [`Pdf2DocxError::TextLayer`] or a lopdf
//!   [`Pdf2DocxError::DocumentOpen`]. The pipeline answers by switching to
//!   OCR; pdfium then gets its own chance to open the file before an error
//!   reaches the caller.
//!
//! * **Fatal stage failures** — rasterisation, recognition and assembly.
//!   One failing page aborts the whole request; there is no partial output.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2docx library.
#[derive(Debug, Error)]
pub enum Pdf2DocxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The buffer does not start with the `%PDF` magic bytes.
    #[error("Input '{name}' is not a PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The PDF container is corrupt, encrypted or otherwise cannot be opened.
    #[error("Cannot open PDF '{name}': {detail}")]
    DocumentOpen { name: String, detail: String },

    /// A page's text layer could not be decoded. Recovered by the OCR fallback.
    #[error("Text layer extraction failed on page {page}: {detail}")]
    TextLayer { page: usize, detail: String },

    /// Page-to-image conversion failed or the rendering backend is unusable.
    #[error("Rasterisation failed{}: {detail}", page_suffix(.page))]
    Rasterization { page: Option<usize>, detail: String },

    /// The recognition backend failed (or timed out) on a page.
    #[error("Text recognition failed on page {page}: {detail}")]
    Recognition { page: usize, detail: String },

    /// The output document could not be serialised.
    #[error("Failed to assemble DOCX: {detail}")]
    Assembly { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output DOCX file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Startup errors ────────────────────────────────────────────────────
    /// A required OCR backend is missing or misconfigured.
    #[error("{backend} backend is unavailable: {detail}\n{hint}")]
    BackendUnavailable {
        backend: &'static str,
        detail: String,
        hint: String,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn page_suffix(page: &Option<usize>) -> String {
    match page {
        Some(p) => format!(" for page {p}"),
        None => String::new(),
    }
}

impl Pdf2DocxError {
    /// Whether the failure is the caller's fault (bad or unreadable input).
    ///
    /// The upload server answers these with `400 Bad Request`; everything
    /// else becomes a generic `500` while the detail goes to the log.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Pdf2DocxError::FileNotFound { .. }
                | Pdf2DocxError::PermissionDenied { .. }
                | Pdf2DocxError::InvalidInput { .. }
                | Pdf2DocxError::DownloadFailed { .. }
                | Pdf2DocxError::DownloadTimeout { .. }
                | Pdf2DocxError::NotAPdf { .. }
                | Pdf2DocxError::DocumentOpen { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rasterization_display_with_page() {
        let e = Pdf2DocxError::Rasterization {
            page: Some(3),
            detail: "bitmap allocation failed".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("for page 3"), "got: {msg}");
        assert!(msg.contains("bitmap allocation failed"));
    }

    #[test]
    fn rasterization_display_without_page() {
        let e = Pdf2DocxError::Rasterization {
            page: None,
            detail: "libpdfium.so not found".into(),
        };
        assert_eq!(
            e.to_string(),
            "Rasterisation failed: libpdfium.so not found"
        );
    }

    #[test]
    fn recognition_display() {
        let e = Pdf2DocxError::Recognition {
            page: 2,
            detail: "timed out after 5s".into(),
        };
        assert!(e.to_string().contains("page 2"));
        assert!(e.to_string().contains("timed out"));
    }

    #[test]
    fn client_errors_are_input_problems() {
        assert!(Pdf2DocxError::NotAPdf {
            name: "a.pdf".into(),
            magic: b"PK\x03\x04".to_vec(),
        }
        .is_client_error());
        assert!(Pdf2DocxError::DocumentOpen {
            name: "a.pdf".into(),
            detail: "bad xref".into(),
        }
        .is_client_error());
        assert!(!Pdf2DocxError::Assembly {
            detail: "zip".into()
        }
        .is_client_error());
        assert!(!Pdf2DocxError::Recognition {
            page: 1,
            detail: "x".into()
        }
        .is_client_error());
    }
}
