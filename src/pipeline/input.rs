//! Input resolution: turn a user-supplied path or URL into a [`SourceDocument`].
//!
//! Both lopdf and pdfium read from memory, so the PDF is loaded into a
//! buffer once and shared by every stage. The `%PDF` magic check happens
//! here, before any parser sees the bytes, so callers get a client error
//! instead of a parser failure deep inside the pipeline.

use crate::document::SourceDocument;
use crate::error::Pdf2DocxError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a loaded PDF.
///
/// URLs are downloaded (bounded by `timeout_secs`); anything else is read as
/// a local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourceDocument, Pdf2DocxError> {
    if input.trim().is_empty() {
        return Err(Pdf2DocxError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Read a local PDF, mapping I/O failures onto input errors.
pub async fn read_local(path: &Path) -> Result<SourceDocument, Pdf2DocxError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2DocxError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => Pdf2DocxError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ if path.is_dir() => Pdf2DocxError::InvalidInput {
            input: path.display().to_string(),
        },
        _ => Pdf2DocxError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    SourceDocument::from_bytes(name, bytes)
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceDocument, Pdf2DocxError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Pdf2DocxError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            Pdf2DocxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(classify)?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let filename = filename_from_url(url);
    let bytes = response.bytes().await.map_err(classify)?;

    info!("Downloaded {} ({} bytes)", filename, bytes.len());
    SourceDocument::from_bytes(filename, bytes.to_vec())
}

/// Last non-empty path segment of the URL, or `downloaded.pdf`.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

/// Default output path for an input: the suggested `.docx` name, placed next
/// to a local input or in the working directory for URLs.
pub fn default_output_path(input: &str) -> PathBuf {
    if is_url(input) {
        PathBuf::from(crate::document::suggested_output_name(&filename_from_url(input)))
    } else {
        let path = Path::new(input);
        let name = crate::document::suggested_output_name(input);
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
            _ => PathBuf::from(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://x.org/files/contrato.pdf"), "contrato.pdf");
        assert_eq!(filename_from_url("https://x.org/files/"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://x.org/download?id=3"), "downloaded.pdf");
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(default_output_path("scans/a.pdf"), PathBuf::from("scans/a.docx"));
        assert_eq!(default_output_path("a.pdf"), PathBuf::from("a.docx"));
        assert_eq!(
            default_output_path("https://x.org/files/contrato.pdf"),
            PathBuf::from("contrato.docx")
        );
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2DocxError::FileNotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn empty_input_is_invalid() {
        let err = resolve_input("  ", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2DocxError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn local_non_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"just some text").unwrap();
        let err = resolve_input(path.to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, Pdf2DocxError::NotAPdf { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn local_pdf_is_loaded_with_its_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.7\n%%EOF\n").unwrap();
        let doc = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(doc.name(), "report.pdf");
        assert_eq!(doc.suggested_output_name(), "report.docx");
    }
}
