//! PDF rasterisation: render pages to `DynamicImage`s.
//!
//! The OCR path drives [`Rasterizer::rasterize_pages`] from a single
//! `tokio::task::spawn_blocking` task per conversion because rendering is
//! CPU-bound and the default backend wraps the pdfium C++ library, which
//! must not run on the async worker threads. Rendered pages are handed to
//! a sink one at a time, so recognition of earlier pages runs while later
//! ones are still rendering.
//!
//! pdfium is not re-entrant. [`PdfiumRasterizer`] keeps one bound library
//! behind a mutex and loads the document once per call.

use crate::document::SourceDocument;
use crate::error::Pdf2DocxError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Longest edge, in pixels, a rendered page may have. Caps memory for
/// oversized pages (an A0 poster at 300 DPI is ~14 000 × 9 900 px).
pub const MAX_RENDER_EDGE: i32 = 10_000;

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;

/// Receives each rendered page as `(index, image)`. Returning `false`
/// stops the render early.
pub type PageSink<'a> = dyn FnMut(usize, DynamicImage) -> bool + 'a;

/// Turns PDF pages into raster images.
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document as seen by the renderer.
    fn page_count(&self, source: &SourceDocument) -> Result<usize, Pdf2DocxError>;

    /// Render page `index` (0-based) at `dpi`.
    fn rasterize_page(
        &self,
        source: &SourceDocument,
        index: usize,
        dpi: u32,
    ) -> Result<DynamicImage, Pdf2DocxError>;

    /// Render pages `0..total_pages` in order, feeding each to `sink`.
    /// Stops at the first failing page.
    ///
    /// The default renders page by page; backends with an expensive
    /// document load override it to load once.
    fn rasterize_pages(
        &self,
        source: &SourceDocument,
        dpi: u32,
        total_pages: usize,
        sink: &mut PageSink<'_>,
    ) -> Result<(), Pdf2DocxError> {
        for index in 0..total_pages {
            let image = self.rasterize_page(source, index, dpi)?;
            if !sink(index, image) {
                break;
            }
        }
        Ok(())
    }
}

/// [`Rasterizer`] backed by pdfium via `pdfium-render`.
pub struct PdfiumRasterizer {
    pdfium: Mutex<Pdfium>,
}

impl PdfiumRasterizer {
    /// Bind to pdfium, either at `library_path` (a directory or the library
    /// file itself) or from the system library search path.
    pub fn new(library_path: Option<&Path>) -> Result<Self, Pdf2DocxError> {
        let bindings = match library_path {
            Some(path) => {
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(path)
                } else {
                    path.to_path_buf()
                };
                debug!("Binding pdfium at {}", lib.display());
                Pdfium::bind_to_library(&lib)
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| Pdf2DocxError::BackendUnavailable {
            backend: "pdfium",
            detail: format!("{e:?}"),
            hint: "Install libpdfium or point --pdfium-lib / PDF2DOCX_PDFIUM_LIB at it.".into(),
        })?;

        Ok(Self {
            pdfium: Mutex::new(Pdfium::new(bindings)),
        })
    }

    fn with_document<T>(
        &self,
        source: &SourceDocument,
        f: impl FnOnce(&PdfDocument<'_>) -> Result<T, Pdf2DocxError>,
    ) -> Result<T, Pdf2DocxError> {
        let pdfium = self.pdfium.lock().map_err(|_| Pdf2DocxError::Rasterization {
            page: None,
            detail: "pdfium lock poisoned by an earlier panic".into(),
        })?;

        let document = pdfium
            .load_pdf_from_byte_slice(source.bytes(), None)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                let detail = if err_str.contains("Password") || err_str.contains("password") {
                    "document is password protected".to_string()
                } else {
                    err_str
                };
                Pdf2DocxError::DocumentOpen {
                    name: source.name().to_string(),
                    detail,
                }
            })?;

        f(&document)
    }
}

/// Render one page of an already loaded document.
fn render_page(
    document: &PdfDocument<'_>,
    index: usize,
    dpi: u32,
) -> Result<DynamicImage, Pdf2DocxError> {
    let raster_error = |detail: String| Pdf2DocxError::Rasterization {
        page: Some(index + 1),
        detail,
    };

    let page_index = u16::try_from(index)
        .map_err(|_| raster_error(format!("page index {index} exceeds pdfium's limit")))?;
    let page = document
        .pages()
        .get(page_index)
        .map_err(|e| raster_error(format!("{:?}", e)))?;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(render_scale(dpi))
        .set_maximum_width(MAX_RENDER_EDGE)
        .set_maximum_height(MAX_RENDER_EDGE);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| raster_error(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px at {} DPI",
        index + 1,
        image.width(),
        image.height(),
        dpi
    );
    Ok(image)
}

impl Rasterizer for PdfiumRasterizer {
    fn page_count(&self, source: &SourceDocument) -> Result<usize, Pdf2DocxError> {
        self.with_document(source, |document| Ok(document.pages().len() as usize))
    }

    fn rasterize_page(
        &self,
        source: &SourceDocument,
        index: usize,
        dpi: u32,
    ) -> Result<DynamicImage, Pdf2DocxError> {
        self.with_document(source, |document| render_page(document, index, dpi))
    }

    fn rasterize_pages(
        &self,
        source: &SourceDocument,
        dpi: u32,
        total_pages: usize,
        sink: &mut PageSink<'_>,
    ) -> Result<(), Pdf2DocxError> {
        self.with_document(source, |document| {
            for index in 0..total_pages {
                if !sink(index, render_page(document, index, dpi)?) {
                    debug!("Rendering stopped after page {}", index + 1);
                    break;
                }
            }
            Ok(())
        })
    }
}

/// Scale factor from PDF points to pixels at `dpi`.
fn render_scale(dpi: u32) -> f32 {
    dpi as f32 / POINTS_PER_INCH
}
