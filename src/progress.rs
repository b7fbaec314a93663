//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages. Per-page events are only
//! emitted on the OCR path; text-layer extraction finishes in milliseconds
//! and reports just the start, the strategy and the completion.
//!
//! # Example
//!
//! ```rust
//! use pdf2docx::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     recognised: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
//!         self.recognised.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("OCR page {}/{} done ({} chars)", page_num, total_pages, text_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { recognised: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::Strategy;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// OCR pages are processed concurrently, so `on_page_start`,
/// `on_page_complete` and `on_page_error` may be called from different
/// tasks at once and in any page order.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the page count is known.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called once, when the extraction strategy has been chosen.
    ///
    /// # Arguments
    /// * `strategy` — the strategy that will produce the document
    /// * `fallback` — true when OCR was chosen because the text layer failed
    fn on_strategy_selected(&self, strategy: Strategy, fallback: bool) {
        let _ = (strategy, fallback);
    }

    /// Called before an OCR page is rasterised.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when an OCR page has been recognised.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages
    /// * `text_len`    — byte length of the page transcript
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when an OCR page fails. The conversion aborts right after.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the output document has been assembled.
    fn on_conversion_complete(&self, total_pages: usize, strategy: Strategy) {
        let _ = (total_pages, strategy);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
