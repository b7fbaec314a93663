//! HTTP upload service.
//!
//! | Route          | Behaviour |
//! |----------------|-----------|
//! | `GET /`        | HTML form posting a PDF to `/convert` |
//! | `POST /convert`| multipart field `file` → `.docx` attachment |
//!
//! Input problems (no file, wrong extension, not a PDF, unreadable PDF)
//! answer `400` with a short plain-text message. Conversion failures answer
//! `500` with a generic message; the detail only goes to the log.

use crate::convert::ConversionPipeline;
use crate::document::SourceDocument;
use crate::error::Pdf2DocxError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::{error, info, warn};

/// MIME type of a `.docx` package.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Default upload size limit (100 MB).
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024 * 1024;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>PDF to DOCX</title>
</head>
<body>
<h1>PDF to DOCX</h1>
<p>Upload a PDF. Scanned documents are run through OCR.</p>
<form action="/convert" method="post" enctype="multipart/form-data">
  <input type="file" name="file" accept=".pdf,application/pdf" required>
  <button type="submit">Convert</button>
</form>
</body>
</html>
"#;

/// Build the service with the default upload limit.
pub fn router(pipeline: Arc<ConversionPipeline>) -> Router {
    router_with_limit(pipeline, DEFAULT_BODY_LIMIT)
}

/// Build the service accepting request bodies up to `body_limit` bytes.
pub fn router_with_limit(pipeline: Arc<ConversionPipeline>, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/convert", post(convert_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(pipeline)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Why an upload was not converted.
#[derive(Debug)]
enum UploadError {
    NoFile,
    NoFileSelected,
    UnsupportedFormat,
    Malformed(String),
    Conversion(Pdf2DocxError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            UploadError::NoFile => (StatusCode::BAD_REQUEST, "No file was uploaded.".to_string()),
            UploadError::NoFileSelected => {
                (StatusCode::BAD_REQUEST, "No file selected.".to_string())
            }
            UploadError::UnsupportedFormat => (
                StatusCode::BAD_REQUEST,
                "Unsupported file format. Please upload a PDF.".to_string(),
            ),
            UploadError::Malformed(detail) => (
                StatusCode::BAD_REQUEST,
                format!("Malformed upload: {detail}"),
            ),
            UploadError::Conversion(e) if e.is_client_error() => {
                warn!("Rejected upload: {}", e);
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            UploadError::Conversion(e) => {
                error!("Conversion failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The document could not be converted.".to_string(),
                )
            }
        };
        (status, message).into_response()
    }
}

/// The `file` field of the upload form.
struct Upload {
    filename: String,
    data: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, UploadError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Malformed(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| UploadError::Malformed(e.to_string()))?
                .to_vec();
            upload = Some(Upload { filename, data });
        } else {
            // Drain unknown fields.
            let _ = field.bytes().await;
        }
    }

    let upload = upload.ok_or(UploadError::NoFile)?;
    if upload.filename.is_empty() {
        return Err(UploadError::NoFileSelected);
    }
    if !upload.filename.to_lowercase().ends_with(".pdf") {
        return Err(UploadError::UnsupportedFormat);
    }
    Ok(upload)
}

async fn convert_upload(
    State(pipeline): State<Arc<ConversionPipeline>>,
    multipart: Multipart,
) -> Result<Response, UploadError> {
    let upload = read_upload(multipart).await?;
    info!("Upload: {} ({} bytes)", upload.filename, upload.data.len());

    let source =
        SourceDocument::from_bytes(upload.filename, upload.data).map_err(UploadError::Conversion)?;
    let output = pipeline
        .convert(&source)
        .await
        .map_err(UploadError::Conversion)?;

    let download_name = source.suggested_output_name();
    info!(
        "Sending {} ({} bytes, {})",
        download_name,
        output.document.bytes.len(),
        output.stats.strategy
    );

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&download_name)),
        ],
        output.document.bytes,
    )
        .into_response())
}

/// `attachment` disposition with an ASCII fallback name and the exact
/// UTF-8 name in `filename*`.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}
