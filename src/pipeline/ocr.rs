//! OCR: rasterise every page and recognise its text.
//!
//! ## Page scheduling
//!
//! Each page is an independent task: rasterise (blocking, on the
//! `spawn_blocking` pool), then recognise (async, a tesseract child
//! process). Up to `concurrency` pages are in flight at once via
//! `buffer_unordered`. Pages finish in any order, so every result is written
//! into a slot array indexed by page number; reading the slots front to back
//! gives page order without a sort.
//!
//! ## Failure policy
//!
//! The first failing page ends the pass. Dropping the remaining futures
//! kills their tesseract processes (`kill_on_drop`) and releases their
//! temporary images. A partial transcript is never returned.
//!
//! ## Timeouts
//!
//! Rasterisation and recognition of a page are each bounded by
//! `page_timeout_secs`. A timeout is reported as a recognition failure of
//! that page.

use crate::config::ConversionConfig;
use crate::document::SourceDocument;
use crate::error::Pdf2DocxError;
use crate::pipeline::encode;
use crate::pipeline::postprocess::clean_transcript;
use crate::pipeline::render::Rasterizer;
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use image::DynamicImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

/// Recognises the text in one page image.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Return the raw transcript of `image`, which shows page `page_num`
    /// (1-indexed). An image without text yields an empty string.
    async fn recognize(&self, page_num: usize, image: DynamicImage)
        -> Result<String, Pdf2DocxError>;
}

/// [`Recognizer`] that shells out to the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: String,
    psm: Option<u8>,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            psm: None,
        }
    }

    pub fn with_page_segmentation_mode(mut self, psm: Option<u8>) -> Self {
        self.psm = psm;
        self
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(&config.tesseract_path, &config.language)
            .with_page_segmentation_mode(config.page_segmentation_mode)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Check that the binary runs and has traineddata for every configured
    /// language. Returns the first line of `tesseract --version`.
    pub fn probe(&self) -> Result<String, Pdf2DocxError> {
        let unavailable = |detail: String| Pdf2DocxError::BackendUnavailable {
            backend: "tesseract",
            detail,
            hint: "Install tesseract-ocr (and its language packs) or set --tesseract / \
                   PDF2DOCX_TESSERACT to its path."
                .into(),
        };

        let version = std::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .map_err(|e| unavailable(format!("cannot run '{}': {e}", self.binary.display())))?;
        if !version.status.success() {
            return Err(unavailable(format!(
                "'{} --version' exited with {}",
                self.binary.display(),
                version.status
            )));
        }
        // Older releases print the banner on stderr.
        let banner = if version.stdout.is_empty() {
            String::from_utf8_lossy(&version.stderr).to_string()
        } else {
            String::from_utf8_lossy(&version.stdout).to_string()
        };
        let version_line = banner.lines().next().unwrap_or("tesseract").trim().to_string();

        let langs = std::process::Command::new(&self.binary)
            .arg("--list-langs")
            .output()
            .map_err(|e| unavailable(format!("cannot list languages: {e}")))?;
        let listing = format!(
            "{}{}",
            String::from_utf8_lossy(&langs.stdout),
            String::from_utf8_lossy(&langs.stderr)
        );
        let installed = parse_language_list(&listing);
        let missing: Vec<&str> = self
            .language
            .split('+')
            .filter(|l| !installed.iter().any(|i| i == l))
            .collect();
        if !missing.is_empty() {
            return Err(unavailable(format!(
                "language data not installed: {} (installed: {})",
                missing.join(", "),
                installed.join(", ")
            )));
        }

        info!(
            "OCR backend ready: {} (languages: {})",
            version_line, self.language
        );
        Ok(version_line)
    }
}

/// Parse `tesseract --list-langs` output. The first line is a header such as
/// `List of available languages in "/usr/share/tessdata/" (3):`.
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of available languages"))
        .filter(|l| !l.contains(' '))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    async fn recognize(
        &self,
        page_num: usize,
        image: DynamicImage,
    ) -> Result<String, Pdf2DocxError> {
        let recognition_error = |detail: String| Pdf2DocxError::Recognition {
            page: page_num,
            detail,
        };

        // Encoding a 300-DPI page is CPU-heavy; keep it off the async workers.
        // The temp file is removed when `png` drops, whichever way we leave.
        let png = tokio::task::spawn_blocking(move || -> Result<tempfile::NamedTempFile, String> {
            let bytes = encode::encode_page(&image).map_err(|e| format!("PNG encoding failed: {e}"))?;
            let mut file = tempfile::Builder::new()
                .prefix("pdf2docx-page-")
                .suffix(".png")
                .tempfile()
                .map_err(|e| format!("cannot create temp image: {e}"))?;
            file.write_all(&bytes)
                .and_then(|_| file.flush())
                .map_err(|e| format!("cannot write temp image: {e}"))?;
            Ok(file)
        })
        .await
        .map_err(|e| recognition_error(format!("encode task panicked: {e}")))?
        .map_err(recognition_error)?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(png.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language);
        if let Some(psm) = self.psm {
            cmd.arg("--psm").arg(psm.to_string());
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        let output = cmd
            .output()
            .await
            .map_err(|e| recognition_error(format!("failed to run tesseract: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(recognition_error(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// A rendered page, or the failure that ended rendering.
type Rendered = Result<(usize, DynamicImage), Pdf2DocxError>;

/// Rasterises and recognises every page of a document.
///
/// One blocking task per conversion renders the pages in order; up to
/// `concurrency` recognitions run on the rendered pages meanwhile. Only one
/// document renders at a time per engine, and a page's render timeout starts
/// once its document holds the renderer.
#[derive(Clone)]
pub struct OcrEngine {
    rasterizer: Arc<dyn Rasterizer>,
    recognizer: Arc<dyn Recognizer>,
    render_gate: Arc<Semaphore>,
    dpi: u32,
    concurrency: usize,
    page_timeout: Duration,
    progress: Option<ProgressCallback>,
}

impl OcrEngine {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        recognizer: Arc<dyn Recognizer>,
        config: &ConversionConfig,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            render_gate: Arc::new(Semaphore::new(1)),
            dpi: config.dpi,
            concurrency: config.concurrency.max(1),
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            progress: config.progress_callback.clone(),
        }
    }

    /// Number of pages as seen by the rasterizer.
    pub async fn page_count(&self, source: &SourceDocument) -> Result<usize, Pdf2DocxError> {
        let rasterizer = Arc::clone(&self.rasterizer);
        let source = source.clone();
        tokio::task::spawn_blocking(move || rasterizer.page_count(&source))
            .await
            .map_err(|e| Pdf2DocxError::Internal(format!("Page count task panicked: {e}")))?
    }

    /// Recognise every page, returning cleaned transcripts in page order.
    pub async fn recognize(&self, source: &SourceDocument) -> Result<Vec<String>, Pdf2DocxError> {
        let total_pages = self.page_count(source).await?;
        self.recognize_pages(source, total_pages).await
    }

    /// Like [`recognize`](Self::recognize) when the page count is already known.
    pub async fn recognize_pages(
        &self,
        source: &SourceDocument,
        total_pages: usize,
    ) -> Result<Vec<String>, Pdf2DocxError> {
        let start = Instant::now();
        info!(
            "OCR: {} pages at {} DPI, {} at a time",
            total_pages, self.dpi, self.concurrency
        );
        if total_pages == 0 {
            return Ok(Vec::new());
        }

        // ── Step 1: Render pages in order on one blocking task ───────────────
        let permit = Arc::clone(&self.render_gate)
            .acquire_owned()
            .await
            .map_err(|e| Pdf2DocxError::Internal(format!("Render gate closed: {e}")))?;
        let (tx, rx) = mpsc::channel::<Rendered>(self.concurrency);
        let rasterizer = Arc::clone(&self.rasterizer);
        let doc = source.clone();
        let dpi = self.dpi;
        let producer = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut sink = |index: usize, image: DynamicImage| tx.blocking_send(Ok((index, image))).is_ok();
            let rendered = rasterizer.rasterize_pages(&doc, dpi, total_pages, &mut sink);
            if let Err(e) = rendered {
                let _ = tx.blocking_send(Err(e));
            }
        });

        // ── Step 2: Recognise rendered pages into indexed slots ──────────────
        let mut slots: Vec<Option<String>> = vec![None; total_pages];
        let mut results = Box::pin(self
            .rendered_pages(rx)
            .map(|rendered| self.process_page(rendered, total_pages))
            .buffer_unordered(self.concurrency));

        while let Some(result) = results.next().await {
            let (index, text) = result?;
            slots[index] = Some(text);
        }
        drop(results);

        if slots.iter().any(Option::is_none) {
            producer
                .await
                .map_err(|e| Pdf2DocxError::Internal(format!("Render task panicked: {e}")))?;
        }
        let pages: Vec<String> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    Pdf2DocxError::Internal(format!("OCR produced no result for page {}", index + 1))
                })
            })
            .collect::<Result<_, _>>()?;

        info!(
            "OCR complete: {} pages, {} chars, {}ms",
            pages.len(),
            pages.iter().map(|p| p.len()).sum::<usize>(),
            start.elapsed().as_millis()
        );
        Ok(pages)
    }

    /// Pages as they come off the renderer. Waiting longer than the page
    /// timeout for the next page ends the stream with a timeout error.
    fn rendered_pages(&self, rx: mpsc::Receiver<Rendered>) -> impl Stream<Item = Rendered> + '_ {
        stream::unfold(Some((rx, 0usize)), move |state| async move {
            let (mut rx, next_index) = state?;
            match tokio::time::timeout(self.page_timeout, rx.recv()).await {
                Ok(Some(Ok((index, image)))) => Some((Ok((index, image)), Some((rx, index + 1)))),
                Ok(Some(Err(e))) => Some((Err(e), None)),
                Ok(None) => None,
                Err(_) => Some((Err(self.timeout_error(next_index + 1, "rasterisation")), None)),
            }
        })
    }

    fn timeout_error(&self, page_num: usize, stage: &str) -> Pdf2DocxError {
        Pdf2DocxError::Recognition {
            page: page_num,
            detail: format!("{stage} timed out after {}s", self.page_timeout.as_secs()),
        }
    }

    async fn process_page(
        &self,
        rendered: Rendered,
        total_pages: usize,
    ) -> Result<(usize, String), Pdf2DocxError> {
        let (index, image) = rendered.inspect_err(|e| warn!("OCR rendering failed: {}", e))?;
        let page_num = index + 1;
        if let Some(ref cb) = self.progress {
            cb.on_page_start(page_num, total_pages);
        }

        let result = self.recognize_page(page_num, image).await;

        match &result {
            Ok(text) => {
                debug!("Page {}: {} chars recognised", page_num, text.len());
                if let Some(ref cb) = self.progress {
                    cb.on_page_complete(page_num, total_pages, text.len());
                }
            }
            Err(e) => {
                warn!("Page {}: OCR failed: {}", page_num, e);
                if let Some(ref cb) = self.progress {
                    cb.on_page_error(page_num, total_pages, &e.to_string());
                }
            }
        }

        result.map(|text| (index, text))
    }

    async fn recognize_page(
        &self,
        page_num: usize,
        image: DynamicImage,
    ) -> Result<String, Pdf2DocxError> {
        let raw = tokio::time::timeout(
            self.page_timeout,
            self.recognizer.recognize(page_num, image),
        )
        .await
        .map_err(|_| self.timeout_error(page_num, "recognition"))??;

        Ok(clean_transcript(&raw))
    }
}
