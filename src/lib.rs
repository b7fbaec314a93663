//! # pdf2docx
//!
//! Convert PDF documents into editable Word (`.docx`) documents.
//!
//! ## Two strategies
//!
//! Most PDFs carry a text layer, and reading it is fast and exact. Scanned
//! PDFs are only pictures of pages; for those the text has to be recognised
//! optically. The converter decides once per document:
//!
//! - if any page has a text layer, every page is taken from the text layer;
//! - otherwise (or if reading the text layer fails) every page is rendered
//!   and run through OCR.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     load a local file or download from URL, check %PDF magic
//!  ├─ 2. Classify  probe the text layer with lopdf (stops at first text page)
//!  ├─ 3a. Text     per-page text from the text layer
//!  ├─ 3b. OCR      pdfium render → PNG → tesseract, pages in parallel
//!  └─ 4. Assemble  paragraphs into a .docx with docx-rs
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2docx::{ConversionConfig, ConversionPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().language("por").build()?;
//!     let pipeline = ConversionPipeline::new(config)?;
//!     let output = pipeline.convert_to_file("contrato.pdf", "contrato.docx").await?;
//!     eprintln!(
//!         "{} pages via {} in {}ms",
//!         output.stats.total_pages, output.stats.strategy, output.stats.total_duration_ms
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdf2docx` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `server` | on      | Enables the upload server: [`server`] module and `pdf2docx-server` binary (axum) |
//!
//! Disable both when using only the library:
//! ```toml
//! pdf2docx = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! The OCR path needs the pdfium shared library and the `tesseract`
//! executable with the configured language data installed.
//! [`ConversionPipeline::new`] checks both up front.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{
    convert, convert_from_bytes, convert_sync, convert_to_file, ConversionPipeline, Stage,
};
pub use document::{suggested_output_name, Page, SourceDocument};
pub use error::Pdf2DocxError;
pub use output::{ConversionOutput, ConversionStats, ExtractionResult, OutputDocument, Strategy};
pub use pipeline::assemble::DocumentAssembler;
pub use pipeline::classify::{Classification, TextPresenceClassifier};
pub use pipeline::ocr::{OcrEngine, Recognizer, TesseractRecognizer};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use pipeline::text_layer::{LopdfTextLayer, PageTextExtractor, TextLayer, TextLayerBackend};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
