//! Shared helpers for the integration tests: synthetic PDFs, fake OCR
//! backends and a DOCX reader.

#![allow(dead_code)]

use async_trait::async_trait;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf2docx::{
    ConversionConfig, ConversionPipeline, LopdfTextLayer, Pdf2DocxError, Rasterizer, Recognizer,
    SourceDocument, TextLayer, TextLayerBackend,
};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Synthetic PDFs ───────────────────────────────────────────────────────────

/// Build a PDF whose pages show the given strings. `None` produces a page
/// with no text operators, which is what a scanned page looks like to a
/// text-layer parser.
pub fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let operations = match text {
            Some(t) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*t)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![Operation::new("q", vec![]), Operation::new("Q", vec![])],
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub fn source(name: &str, pages: &[Option<&str>]) -> SourceDocument {
    SourceDocument::from_bytes(name, build_pdf(pages)).unwrap()
}

/// A PDF of `n` pages without any text layer.
pub fn scanned(name: &str, n: usize) -> SourceDocument {
    source(name, &vec![None; n])
}

// ── Fake OCR backends ────────────────────────────────────────────────────────

/// Rasterizer that renders blank images and counts its calls. Renders are
/// serialised on a lock, the way pdfium's are.
#[derive(Default)]
pub struct FakeRasterizer {
    pub page_count: usize,
    pub calls: AtomicUsize,
    pub fail_open: bool,
    /// 1-indexed page whose render fails.
    pub fail_on: Option<usize>,
    /// Render time per page in milliseconds.
    pub delays_ms: Vec<u64>,
    pub lock: Mutex<()>,
}

impl FakeRasterizer {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Rasterizer for FakeRasterizer {
    fn page_count(&self, source: &SourceDocument) -> Result<usize, Pdf2DocxError> {
        if self.fail_open {
            return Err(Pdf2DocxError::DocumentOpen {
                name: source.name().to_string(),
                detail: "FPDF_ERR_FORMAT".into(),
            });
        }
        Ok(self.page_count)
    }

    fn rasterize_page(
        &self,
        _source: &SourceDocument,
        index: usize,
        _dpi: u32,
    ) -> Result<DynamicImage, Pdf2DocxError> {
        let _guard = self.lock.lock().unwrap();
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ms) = self.delays_ms.get(index) {
            std::thread::sleep(Duration::from_millis(*ms));
        }
        if self.fail_on == Some(index + 1) {
            return Err(Pdf2DocxError::Rasterization {
                page: Some(index + 1),
                detail: "FPDF_RenderPageBitmap failed".into(),
            });
        }
        Ok(DynamicImage::new_luma8(4, 4))
    }
}

/// Recognizer with scripted transcripts, per-page delays and an optional
/// failing page.
#[derive(Default)]
pub struct FakeRecognizer {
    /// Transcript per page (index = page_num - 1). Missing entries yield
    /// `"page N"`.
    pub transcripts: Vec<String>,
    /// Delay per page in milliseconds.
    pub delays_ms: Vec<u64>,
    /// 1-indexed page that fails.
    pub fail_on: Option<usize>,
    pub calls: AtomicUsize,
}

impl FakeRecognizer {
    pub fn with_transcripts(transcripts: &[&str]) -> Self {
        Self {
            transcripts: transcripts.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn recognize(&self, page_num: usize, _image: DynamicImage) -> Result<String, Pdf2DocxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ms) = self.delays_ms.get(page_num - 1) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.fail_on == Some(page_num) {
            return Err(Pdf2DocxError::Recognition {
                page: page_num,
                detail: "tesseract exited with exit status: 1".into(),
            });
        }
        Ok(self
            .transcripts
            .get(page_num - 1)
            .cloned()
            .unwrap_or_else(|| format!("page {page_num}")))
    }
}

/// Text-layer backend whose pages all fail to decode.
pub struct BrokenTextLayer;

struct BrokenPages(usize);

impl TextLayer for BrokenPages {
    fn page_count(&self) -> usize {
        self.0
    }

    fn page_text(&self, index: usize) -> Result<Option<String>, Pdf2DocxError> {
        Err(Pdf2DocxError::TextLayer {
            page: index + 1,
            detail: "unsupported font encoding".into(),
        })
    }
}

impl TextLayerBackend for BrokenTextLayer {
    fn open(&self, _source: &SourceDocument) -> Result<Box<dyn TextLayer>, Pdf2DocxError> {
        Ok(Box::new(BrokenPages(2)))
    }
}

/// Text-layer backend that finds text on page 1 and then fails on page 2,
/// so the failure surfaces during extraction rather than classification.
pub struct FailsAfterProbe;

struct FailsAfterProbePages;

impl TextLayer for FailsAfterProbePages {
    fn page_count(&self) -> usize {
        2
    }

    fn page_text(&self, index: usize) -> Result<Option<String>, Pdf2DocxError> {
        match index {
            0 => Ok(Some("Visible text".into())),
            _ => Err(Pdf2DocxError::TextLayer {
                page: index + 1,
                detail: "broken content stream".into(),
            }),
        }
    }
}

impl TextLayerBackend for FailsAfterProbe {
    fn open(&self, _source: &SourceDocument) -> Result<Box<dyn TextLayer>, Pdf2DocxError> {
        Ok(Box::new(FailsAfterProbePages))
    }
}

/// Text-layer backend that panics, like a parser choking on a malformed file.
pub struct PanickingTextLayer;

impl TextLayerBackend for PanickingTextLayer {
    fn open(&self, _source: &SourceDocument) -> Result<Box<dyn TextLayer>, Pdf2DocxError> {
        panic!("xref offset points past end of file")
    }
}

pub fn config() -> ConversionConfig {
    ConversionConfig::builder()
        .concurrency(4)
        .page_timeout_secs(5)
        .build()
        .unwrap()
}

/// Pipeline on lopdf plus the given fake OCR backends.
pub fn pipeline(
    config: ConversionConfig,
    rasterizer: Arc<FakeRasterizer>,
    recognizer: Arc<FakeRecognizer>,
) -> ConversionPipeline {
    pipeline_with_text(config, Arc::new(LopdfTextLayer), rasterizer, recognizer)
}

pub fn pipeline_with_text(
    config: ConversionConfig,
    text_layer: Arc<dyn TextLayerBackend>,
    rasterizer: Arc<FakeRasterizer>,
    recognizer: Arc<FakeRecognizer>,
) -> ConversionPipeline {
    ConversionPipeline::with_backends(config, text_layer, rasterizer, recognizer)
}

// ── DOCX readback ────────────────────────────────────────────────────────────

/// Text of every `w:p` in `word/document.xml`, in order. `w:br` reads as
/// `\n` and `w:tab` as `\t`.
pub fn docx_paragraphs(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("output is a zip package");
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .expect("package has word/document.xml")
        .read_to_string(&mut xml)
        .unwrap();

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event().expect("well-formed document.xml") {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => current = Some(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:br" => {
                    if let Some(p) = current.as_mut() {
                        p.push('\n');
                    }
                }
                b"w:tab" => {
                    if let Some(p) = current.as_mut() {
                        p.push('\t');
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(p) = current.as_mut() {
                    p.push_str(&t.unescape().unwrap());
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    paragraphs
}
