//! Conversion entry points and the pipeline state machine.
//!
//! ```text
//! Start ─▶ Classifying ─┬─▶ ExtractingText ────┬─▶ Assembling ─▶ Done
//!                       │        │ (fails)      │
//!                       └────────┴─▶ RecognizingViaOcr
//!
//!                 any state ─▶ Failed
//! ```
//!
//! Classification and text extraction never fail a conversion: whatever
//! goes wrong on the text path (parse error, unsupported encoding, even a
//! parser panic) is logged and answered by OCR. Failures on the OCR path and
//! in assembly propagate; a partially recognised document is never returned.

use crate::config::ConversionConfig;
use crate::document::SourceDocument;
use crate::error::Pdf2DocxError;
use crate::output::{ConversionOutput, ConversionStats, ExtractionResult, Strategy};
use crate::pipeline::assemble::DocumentAssembler;
use crate::pipeline::classify::{Classification, TextPresenceClassifier};
use crate::pipeline::input;
use crate::pipeline::ocr::{OcrEngine, Recognizer, TesseractRecognizer};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::pipeline::text_layer::{extract_pages, LopdfTextLayer, PageTextExtractor, TextLayerBackend};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a conversion currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Classifying,
    ExtractingText,
    RecognizingViaOcr,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Start => "start",
            Stage::Classifying => "classifying",
            Stage::ExtractingText => "extracting-text",
            Stage::RecognizingViaOcr => "recognizing-via-ocr",
            Stage::Assembling => "assembling",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Logs every stage transition of one conversion.
struct StageLog<'a> {
    document: &'a str,
    stage: Stage,
}

impl<'a> StageLog<'a> {
    fn new(document: &'a str) -> Self {
        Self {
            document,
            stage: Stage::Start,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!("{}: {} → {}", self.document, self.stage, next);
        self.stage = next;
    }
}

/// How the page texts will be produced, decided after classification.
enum Plan {
    Text(Vec<String>),
    Ocr { fallback_reason: Option<String> },
}

/// The PDF → DOCX converter.
///
/// Holds the configuration and the three backends (text layer, rasterizer,
/// recognizer). Conversions share no mutable state, so one pipeline can
/// serve many requests at once behind an `Arc`.
#[derive(Clone)]
pub struct ConversionPipeline {
    config: ConversionConfig,
    classifier: TextPresenceClassifier,
    ocr: OcrEngine,
    assembler: DocumentAssembler,
}

impl fmt::Debug for ConversionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConversionPipeline {
    /// Build a pipeline on the default backends: lopdf, pdfium and the
    /// tesseract CLI.
    ///
    /// Binds pdfium and probes tesseract (binary and language data) up
    /// front, so a misconfigured host fails here instead of on the first
    /// scanned upload.
    ///
    /// # Errors
    /// [`Pdf2DocxError::BackendUnavailable`] if pdfium cannot be loaded, the
    /// tesseract binary cannot be run, or a configured language is missing.
    pub fn new(config: ConversionConfig) -> Result<Self, Pdf2DocxError> {
        let recognizer = TesseractRecognizer::from_config(&config);
        recognizer.probe()?;
        let rasterizer = PdfiumRasterizer::new(config.pdfium_library_path.as_deref())?;

        Ok(Self::with_backends(
            config,
            Arc::new(LopdfTextLayer),
            Arc::new(rasterizer),
            Arc::new(recognizer),
        ))
    }

    /// Build a pipeline on caller-supplied backends.
    pub fn with_backends(
        config: ConversionConfig,
        text_layer: Arc<dyn TextLayerBackend>,
        rasterizer: Arc<dyn Rasterizer>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Self {
        let classifier = TextPresenceClassifier::new(PageTextExtractor::new(text_layer));
        let ocr = OcrEngine::new(rasterizer, recognizer, &config);
        Self {
            config,
            classifier,
            ocr,
            assembler: DocumentAssembler::new(),
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert a loaded PDF.
    ///
    /// # Errors
    /// - [`Pdf2DocxError::DocumentOpen`] if neither parser can open the file
    /// - [`Pdf2DocxError::Rasterization`] / [`Pdf2DocxError::Recognition`]
    ///   if any page fails on the OCR path
    /// - [`Pdf2DocxError::Assembly`] if the `.docx` cannot be written
    pub async fn convert(&self, source: &SourceDocument) -> Result<ConversionOutput, Pdf2DocxError> {
        let mut log = StageLog::new(source.name());
        info!("Starting conversion: {} ({} bytes)", source.name(), source.len());

        match self.run(source, &mut log).await {
            Ok(output) => {
                log.advance(Stage::Done);
                Ok(output)
            }
            Err(e) => {
                warn!("{}: conversion failed while {}: {}", source.name(), log.stage, e);
                log.advance(Stage::Failed);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        source: &SourceDocument,
        log: &mut StageLog<'_>,
    ) -> Result<ConversionOutput, Pdf2DocxError> {
        let total_start = Instant::now();
        let cb = self.config.progress_callback.as_ref();

        // ── Step 1: Classify and try the text layer ──────────────────────────
        let classify_start = Instant::now();
        let plan = if self.config.force_ocr {
            info!("{}: OCR forced by configuration", source.name());
            Plan::Ocr {
                fallback_reason: None,
            }
        } else {
            self.plan_from_text_layer(source, log).await
        };
        let classify_duration_ms = classify_start.elapsed().as_millis() as u64;

        // ── Step 2: Produce page texts ───────────────────────────────────────
        let extract_start = Instant::now();
        let (extraction, fallback_reason) = match plan {
            Plan::Text(pages) => {
                if let Some(cb) = cb {
                    cb.on_conversion_start(pages.len());
                    cb.on_strategy_selected(Strategy::TextLayer, false);
                }
                (ExtractionResult::new(Strategy::TextLayer, pages), None)
            }
            Plan::Ocr { fallback_reason } => {
                log.advance(Stage::RecognizingViaOcr);
                let total_pages = self.ocr.page_count(source).await?;
                if let Some(cb) = cb {
                    cb.on_conversion_start(total_pages);
                    cb.on_strategy_selected(Strategy::Ocr, fallback_reason.is_some());
                }
                let pages = self.ocr.recognize_pages(source, total_pages).await?;
                (ExtractionResult::new(Strategy::Ocr, pages), fallback_reason)
            }
        };
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

        // ── Step 3: Assemble ─────────────────────────────────────────────────
        log.advance(Stage::Assembling);
        let assemble_start = Instant::now();
        let document = self.assembler.assemble(&extraction)?;
        let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;

        // ── Step 4: Stats ────────────────────────────────────────────────────
        let stats = ConversionStats {
            total_pages: extraction.page_count(),
            strategy: extraction.strategy(),
            fallback_reason,
            empty_pages: extraction
                .pages()
                .iter()
                .filter(|p| p.trim().is_empty())
                .count(),
            output_bytes: document.bytes.len(),
            classify_duration_ms,
            extract_duration_ms,
            assemble_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Conversion complete: {} via {}, {} pages ({} empty), {} bytes, {}ms",
            source.name(),
            stats.strategy,
            stats.total_pages,
            stats.empty_pages,
            stats.output_bytes,
            stats.total_duration_ms
        );

        if let Some(cb) = cb {
            cb.on_conversion_complete(stats.total_pages, stats.strategy);
        }

        Ok(ConversionOutput {
            document,
            extraction,
            stats,
        })
    }

    /// Probe the text layer and, if it carries text, extract every page.
    /// Any failure on this path turns into an OCR plan.
    async fn plan_from_text_layer(&self, source: &SourceDocument, log: &mut StageLog<'_>) -> Plan {
        log.advance(Stage::Classifying);

        let classifier = self.classifier.clone();
        let doc = source.clone();
        let classification = tokio::task::spawn_blocking(move || classifier.classify(&doc))
            .await
            .unwrap_or_else(|e| {
                Classification::Unreadable(Pdf2DocxError::Internal(format!(
                    "Text layer probe panicked: {e}"
                )))
            });

        let layer = match classification {
            Classification::TextBearing {
                layer,
                first_text_page,
            } => {
                info!(
                    "{}: text layer found (first text on page {}); using text-layer strategy",
                    source.name(),
                    first_text_page + 1
                );
                layer
            }
            Classification::ImageOnly { page_count } => {
                info!(
                    "{}: no text layer on any of {} pages; using OCR",
                    source.name(),
                    page_count
                );
                return Plan::Ocr {
                    fallback_reason: None,
                };
            }
            Classification::Unreadable(e) => {
                warn!("{}: text layer probe failed, falling back to OCR: {}", source.name(), e);
                return Plan::Ocr {
                    fallback_reason: Some(e.to_string()),
                };
            }
        };

        log.advance(Stage::ExtractingText);
        let extracted = tokio::task::spawn_blocking(move || extract_pages(layer.as_ref()))
            .await
            .unwrap_or_else(|e| Err(Pdf2DocxError::Internal(format!("Text extraction panicked: {e}"))));

        match extracted {
            Ok(pages) => Plan::Text(
                pages
                    .into_iter()
                    .map(|page| page.text.unwrap_or_default())
                    .collect(),
            ),
            Err(e) => {
                warn!("{}: text extraction failed, falling back to OCR: {}", source.name(), e);
                Plan::Ocr {
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Load a local path or URL and convert it.
    pub async fn convert_input(&self, input: &str) -> Result<ConversionOutput, Pdf2DocxError> {
        let source = input::resolve_input(input, self.config.download_timeout_secs).await?;
        self.convert(&source).await
    }

    /// Convert a local path or URL and write the `.docx` to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn convert_to_file(
        &self,
        input: &str,
        output_path: impl AsRef<Path>,
    ) -> Result<ConversionOutput, Pdf2DocxError> {
        let output = self.convert_input(input).await?;
        write_atomic(output_path.as_ref(), &output.document.bytes).await?;
        Ok(output)
    }
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2DocxError> {
    let write_failed = |e: std::io::Error| Pdf2DocxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("docx.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Convert a PDF file or URL to DOCX on the default backends.
///
/// Builds a fresh [`ConversionPipeline`] for the call; long-running
/// services should build one pipeline and reuse it.
///
/// # Example
/// ```rust,no_run
/// use pdf2docx::{convert, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::builder().language("eng").build()?;
/// let output = convert("scan.pdf", &config).await?;
/// std::fs::write("scan.docx", &output.document.bytes)?;
/// eprintln!("strategy: {}", output.stats.strategy);
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2DocxError> {
    ConversionPipeline::new(config.clone())?
        .convert_input(input.as_ref())
        .await
}

/// Convert PDF bytes already in memory.
pub async fn convert_from_bytes(
    name: impl Into<String>,
    bytes: impl Into<Arc<[u8]>>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2DocxError> {
    let source = SourceDocument::from_bytes(name, bytes)?;
    ConversionPipeline::new(config.clone())?.convert(&source).await
}

/// Convert a PDF file or URL and write the result to `output_path`.
pub async fn convert_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Pdf2DocxError> {
    let output = ConversionPipeline::new(config.clone())?
        .convert_to_file(input.as_ref(), output_path)
        .await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2DocxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2DocxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}
