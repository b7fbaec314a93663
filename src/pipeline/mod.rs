//! Pipeline stages for PDF-to-DOCX conversion.
//!
//! Each submodule implements exactly one step. The backends each stage
//! talks to (lopdf, pdfium, tesseract) sit behind traits so the
//! orchestration in [`crate::convert`] can be tested without them.
//!
//! ## Data Flow
//!
//! ```text
//!                      ┌─▶ text_layer ───────────────────────────┐
//! input ──▶ classify ──┤                                         ├──▶ assemble
//! (path/URL)  (lopdf)  └─▶ render ──▶ encode ──▶ ocr ──▶ postprocess   (docx-rs)
//!                         (pdfium)    (PNG)   (tesseract)  (cleanup)
//! ```
//!
//! 1. [`input`]      — load the PDF from a path or URL, check its magic bytes
//! 2. [`classify`]   — does any page carry a text layer?
//! 3. [`text_layer`] — per-page text extraction (the fast path)
//! 4. [`render`]     — rasterise pages; blocking, runs in `spawn_blocking`
//! 5. [`encode`]     — greyscale PNG for the recogniser
//! 6. [`ocr`]        — concurrent per-page recognition with timeouts
//! 7. [`postprocess`] — deterministic cleanup of OCR transcripts
//! 8. [`assemble`]   — paragraphs into a `.docx` package

pub mod assemble;
pub mod classify;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod postprocess;
pub mod render;
pub mod text_layer;
