//! Configuration types for PDF-to-DOCX conversion.
//!
//! Every knob lives in [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. The config is passed explicitly into
//! [`crate::convert::ConversionPipeline`] construction; nothing is read from
//! process-wide state, so several pipelines with different backends or
//! languages can live side by side in one process.

use crate::error::Pdf2DocxError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Lowest accepted rasterisation DPI.
pub const MIN_DPI: u32 = 72;
/// Highest accepted rasterisation DPI.
pub const MAX_DPI: u32 = 600;

/// Configuration for a PDF-to-DOCX conversion.
///
/// # Example
/// ```rust
/// use pdf2docx::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .dpi(200)
///     .language("eng")
///     .concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.language, "eng");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rasterisation DPI for the OCR path. Range: 72–600. Default: 300.
    ///
    /// Tesseract is tuned for glyphs around 20–30 px high; 300 DPI puts
    /// ordinary 10–12 pt body text in that band.
    pub dpi: u32,

    /// Tesseract language code(s), e.g. `"por"`, `"eng"` or `"por+eng"`.
    /// Default: `"por"`.
    pub language: String,

    /// Path or command name of the tesseract executable. Default: `"tesseract"`.
    pub tesseract_path: PathBuf,

    /// Directory (or full path) of the pdfium shared library.
    /// If None, the system library search path is used.
    pub pdfium_library_path: Option<PathBuf>,

    /// Tesseract page segmentation mode (`--psm`). If None, tesseract's
    /// default (fully automatic segmentation) applies.
    pub page_segmentation_mode: Option<u8>,

    /// Number of pages rasterised and recognised at once. Default: 4.
    pub concurrency: usize,

    /// Upper bound for each page's rasterisation and for each page's
    /// recognition, in seconds. Default: 120.
    pub page_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Skip the text layer entirely and always OCR. Default: false.
    pub force_ocr: bool,

    /// Receives per-stage and per-page events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            language: "por".to_string(),
            tesseract_path: PathBuf::from("tesseract"),
            pdfium_library_path: None,
            page_segmentation_mode: None,
            concurrency: 4,
            page_timeout_secs: 120,
            download_timeout_secs: 120,
            force_ocr: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("language", &self.language)
            .field("tesseract_path", &self.tesseract_path)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("page_segmentation_mode", &self.page_segmentation_mode)
            .field("concurrency", &self.concurrency)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("force_ocr", &self.force_ocr)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(MIN_DPI, MAX_DPI);
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn page_segmentation_mode(mut self, psm: u8) -> Self {
        self.config.page_segmentation_mode = Some(psm);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn force_ocr(mut self, v: bool) -> Self {
        self.config.force_ocr = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2DocxError> {
        let c = &self.config;
        if c.dpi < MIN_DPI || c.dpi > MAX_DPI {
            return Err(Pdf2DocxError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(Pdf2DocxError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.page_timeout_secs == 0 {
            return Err(Pdf2DocxError::InvalidConfig(
                "Page timeout must be ≥ 1 second".into(),
            ));
        }
        if !is_valid_language(&c.language) {
            return Err(Pdf2DocxError::InvalidConfig(format!(
                "Invalid OCR language '{}': expected codes like 'por' or 'por+eng'",
                c.language
            )));
        }
        if let Some(psm) = c.page_segmentation_mode {
            if psm > 13 {
                return Err(Pdf2DocxError::InvalidConfig(format!(
                    "Page segmentation mode must be 0–13, got {psm}"
                )));
            }
        }
        Ok(self.config)
    }
}

/// Tesseract language specs are `+`-joined traineddata names such as
/// `por`, `chi_sim` or `script/Latin`.
fn is_valid_language(lang: &str) -> bool {
    !lang.is_empty()
        && lang.split('+').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '/' || c == '-')
        })
}
