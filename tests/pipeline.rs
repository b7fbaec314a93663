//! Conversion pipeline behaviour: strategy selection, OCR fallback, page
//! ordering and failure propagation.
//!
//! The text layer is real (lopdf on synthetic PDFs); rasterisation and
//! recognition are fakes, so these tests need neither pdfium nor tesseract.

mod common;

use common::*;
use pdf2docx::{
    ConversionConfig, ConversionProgressCallback, Pdf2DocxError, Strategy, TextPresenceClassifier,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Strategy selection ───────────────────────────────────────────────────────

#[tokio::test]
async fn text_bearing_pdf_never_touches_ocr() {
    let rasterizer = Arc::new(FakeRasterizer::new(2));
    let recognizer = Arc::new(FakeRecognizer::default());
    let p = pipeline(config(), rasterizer.clone(), recognizer.clone());

    let out = p
        .convert(&source("two.pdf", &[Some("First page"), Some("Second page")]))
        .await
        .unwrap();

    assert_eq!(out.stats.strategy, Strategy::TextLayer);
    assert_eq!(out.extraction.pages(), ["First page", "Second page"]);
    assert_eq!(rasterizer.calls(), 0);
    assert_eq!(recognizer.calls(), 0);
    assert!(out.stats.fallback_reason.is_none());
}

#[tokio::test]
async fn hello_world_is_the_sole_paragraph() {
    let p = pipeline(
        config(),
        Arc::new(FakeRasterizer::new(1)),
        Arc::new(FakeRecognizer::default()),
    );
    let out = p.convert(&source("hello.pdf", &[Some("Hello World")])).await.unwrap();

    assert_eq!(docx_paragraphs(&out.document.bytes), vec!["Hello World"]);
    assert_eq!(out.document.paragraphs, vec!["Hello World"]);
}

#[tokio::test]
async fn one_text_page_selects_text_layer_for_all_pages() {
    let recognizer = Arc::new(FakeRecognizer::default());
    let p = pipeline(config(), Arc::new(FakeRasterizer::new(3)), recognizer.clone());

    let out = p
        .convert(&source("mixed.pdf", &[None, Some("Only text"), None]))
        .await
        .unwrap();

    assert_eq!(out.stats.strategy, Strategy::TextLayer);
    assert_eq!(out.extraction.pages(), ["", "Only text", ""]);
    assert_eq!(out.stats.empty_pages, 2);
    assert_eq!(docx_paragraphs(&out.document.bytes), vec!["", "Only text", ""]);
    assert_eq!(recognizer.calls(), 0);
}

#[tokio::test]
async fn image_only_pdf_selects_ocr() {
    let rasterizer = Arc::new(FakeRasterizer::new(2));
    let recognizer = Arc::new(FakeRecognizer::with_transcripts(&["Scanned one", "Scanned two"]));
    let p = pipeline(config(), rasterizer.clone(), recognizer.clone());

    let out = p.convert(&scanned("scan.pdf", 2)).await.unwrap();

    assert_eq!(out.stats.strategy, Strategy::Ocr);
    assert!(out.stats.fallback_reason.is_none());
    assert_eq!(out.extraction.pages(), ["Scanned one", "Scanned two"]);
    assert_eq!(rasterizer.calls(), 2);
    assert_eq!(recognizer.calls(), 2);
    assert_eq!(
        docx_paragraphs(&out.document.bytes),
        vec!["Scanned one", "", "Scanned two"]
    );
}

#[tokio::test]
async fn whitespace_only_text_layer_counts_as_image_only() {
    let recognizer = Arc::new(FakeRecognizer::with_transcripts(&["TEST"]));
    let p = pipeline(config(), Arc::new(FakeRasterizer::new(1)), recognizer.clone());

    let out = p.convert(&source("blank.pdf", &[Some("   ")])).await.unwrap();

    assert_eq!(out.stats.strategy, Strategy::Ocr);
    assert_eq!(recognizer.calls(), 1);
}

#[tokio::test]
async fn classifier_agrees_with_pipeline() {
    let classifier = TextPresenceClassifier::default();
    assert!(classifier
        .has_extractable_text(&source("t.pdf", &[None, Some("x")]))
        .unwrap());
    assert!(!classifier.has_extractable_text(&scanned("s.pdf", 3)).unwrap());
}

#[tokio::test]
async fn force_ocr_skips_the_text_layer() {
    let cfg = ConversionConfig::builder().force_ocr(true).build().unwrap();
    let recognizer = Arc::new(FakeRecognizer::with_transcripts(&["from ocr"]));
    let p = pipeline(cfg, Arc::new(FakeRasterizer::new(1)), recognizer.clone());

    let out = p.convert(&source("t.pdf", &[Some("from text layer")])).await.unwrap();

    assert_eq!(out.stats.strategy, Strategy::Ocr);
    assert_eq!(out.extraction.pages(), ["from ocr"]);
}

// ── Fallback ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failing_text_probe_falls_back_to_ocr() {
    let recognizer = Arc::new(FakeRecognizer::with_transcripts(&["recovered 1", "recovered 2"]));
    let p = pipeline_with_text(
        config(),
        Arc::new(BrokenTextLayer),
        Arc::new(FakeRasterizer::new(2)),
        recognizer.clone(),
    );

    let out = p.convert(&scanned("enc.pdf", 2)).await.unwrap();

    assert_eq!(out.stats.strategy, Strategy::Ocr);
    let reason = out.stats.fallback_reason.expect("fallback reason recorded");
    assert!(reason.contains("unsupported font encoding"), "got {reason}");
    assert_eq!(out.extraction.pages(), ["recovered 1", "recovered 2"]);
    assert!(!out.document.bytes.is_empty());
}

#[tokio::test]
async fn failing_extraction_after_positive_probe_falls_back_to_ocr() {
    let recognizer = Arc::new(FakeRecognizer::with_transcripts(&["a", "b"]));
    let p = pipeline_with_text(
        config(),
        Arc::new(FailsAfterProbe),
        Arc::new(FakeRasterizer::new(2)),
        recognizer.clone(),
    );

    let out = p.convert(&scanned("half.pdf", 2)).await.unwrap();

    assert_eq!(out.stats.strategy, Strategy::Ocr);
    assert!(out.stats.fallback_reason.unwrap().contains("broken content stream"));
    assert_eq!(recognizer.calls(), 2);
}

#[tokio::test]
async fn panicking_text_parser_falls_back_to_ocr() {
    let p = pipeline_with_text(
        config(),
        Arc::new(PanickingTextLayer),
        Arc::new(FakeRasterizer::new(1)),
        Arc::new(FakeRecognizer::with_transcripts(&["ok"])),
    );

    let out = p.convert(&scanned("odd.pdf", 1)).await.unwrap();
    assert_eq!(out.stats.strategy, Strategy::Ocr);
    assert_eq!(out.extraction.pages(), ["ok"]);
}

#[tokio::test]
async fn unparseable_pdf_falls_back_then_reports_document_open() {
    let rasterizer = Arc::new(FakeRasterizer {
        fail_open: true,
        ..FakeRasterizer::new(0)
    });
    let p = pipeline(config(), rasterizer, Arc::new(FakeRecognizer::default()));

    let doc = pdf2docx::SourceDocument::from_bytes("junk.pdf", b"%PDF-1.4\ngarbage".to_vec()).unwrap();
    let err = p.convert(&doc).await.unwrap_err();

    assert!(matches!(err, Pdf2DocxError::DocumentOpen { .. }), "got {err:?}");
    assert!(err.is_client_error());
}

// ── OCR ordering and failure ─────────────────────────────────────────────────

#[tokio::test]
async fn ocr_output_follows_page_order_not_completion_order() {
    let recognizer = Arc::new(FakeRecognizer {
        transcripts: vec!["one".into(), "two".into(), "three".into(), "four".into()],
        // Page 1 finishes last, page 4 first.
        delays_ms: vec![120, 80, 40, 0],
        ..Default::default()
    });
    let p = pipeline(config(), Arc::new(FakeRasterizer::new(4)), recognizer);

    let out = p.convert(&scanned("slow.pdf", 4)).await.unwrap();

    assert_eq!(out.extraction.pages(), ["one", "two", "three", "four"]);
    assert_eq!(
        out.document.paragraphs,
        vec!["one", "", "two", "", "three", "", "four"]
    );
}

#[tokio::test]
async fn recognition_failure_on_page_two_fails_the_conversion() {
    let recognizer = Arc::new(FakeRecognizer {
        fail_on: Some(2),
        ..Default::default()
    });
    let p = pipeline(config(), Arc::new(FakeRasterizer::new(3)), recognizer);

    let err = p.convert(&scanned("three.pdf", 3)).await.unwrap_err();

    assert!(
        matches!(err, Pdf2DocxError::Recognition { page: 2, .. }),
        "got {err:?}"
    );
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn slow_recognition_times_out_as_recognition_error() {
    let cfg = ConversionConfig::builder().page_timeout_secs(1).build().unwrap();
    let recognizer = Arc::new(FakeRecognizer {
        delays_ms: vec![0, 3_000],
        ..Default::default()
    });
    let p = pipeline(cfg, Arc::new(FakeRasterizer::new(2)), recognizer);

    let err = p.convert(&scanned("stuck.pdf", 2)).await.unwrap_err();

    match err {
        Pdf2DocxError::Recognition { page, detail } => {
            assert_eq!(page, 2);
            assert!(detail.contains("timed out"), "got {detail}");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn render_failure_fails_the_conversion_with_the_page() {
    let rasterizer = Arc::new(FakeRasterizer {
        page_count: 3,
        fail_on: Some(2),
        ..Default::default()
    });
    let p = pipeline(config(), rasterizer.clone(), Arc::new(FakeRecognizer::default()));

    let err = p.convert(&scanned("torn.pdf", 3)).await.unwrap_err();

    assert!(!err.is_client_error());
    match err {
        Pdf2DocxError::Rasterization { page, .. } => assert_eq!(page, Some(2)),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(rasterizer.calls(), 2, "rendering stops at the failing page");
}

#[tokio::test]
async fn slow_render_times_out_as_recognition_error() {
    let cfg = ConversionConfig::builder().page_timeout_secs(1).build().unwrap();
    let rasterizer = Arc::new(FakeRasterizer {
        page_count: 2,
        delays_ms: vec![0, 1_500],
        ..Default::default()
    });
    let p = pipeline(cfg, rasterizer, Arc::new(FakeRecognizer::default()));

    let err = p.convert(&scanned("heavy.pdf", 2)).await.unwrap_err();

    match err {
        Pdf2DocxError::Recognition { page, detail } => {
            assert_eq!(page, 2);
            assert!(detail.contains("rasterisation timed out"), "got {detail}");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn page_timeout_covers_each_render_not_the_queue() {
    // Each render fits the limit; all four together do not.
    let cfg = ConversionConfig::builder()
        .concurrency(4)
        .page_timeout_secs(1)
        .build()
        .unwrap();
    let rasterizer = Arc::new(FakeRasterizer {
        page_count: 4,
        delays_ms: vec![400; 4],
        ..Default::default()
    });
    let p = pipeline(cfg, rasterizer, Arc::new(FakeRecognizer::default()));

    let out = p.convert(&scanned("slow.pdf", 4)).await.unwrap();

    assert_eq!(out.extraction.pages(), ["page 1", "page 2", "page 3", "page 4"]);
}

#[tokio::test]
async fn ocr_transcripts_are_cleaned() {
    let recognizer = Arc::new(FakeRecognizer::with_transcripts(&[
        "TEST\r\n\r\n\r\n\r\nline two  \n\u{000C}",
        " \n\u{000C}",
    ]));
    let p = pipeline(config(), Arc::new(FakeRasterizer::new(2)), recognizer);

    let out = p.convert(&scanned("dirty.pdf", 2)).await.unwrap();

    assert_eq!(out.extraction.pages(), ["TEST\n\nline two", ""]);
    assert_eq!(out.stats.empty_pages, 1);
    assert_eq!(
        docx_paragraphs(&out.document.bytes),
        vec!["TEST\n\nline two", "", ""]
    );
}

#[tokio::test]
async fn concurrency_one_still_orders_pages() {
    let cfg = ConversionConfig::builder().concurrency(1).build().unwrap();
    let p = pipeline(
        cfg,
        Arc::new(FakeRasterizer::new(3)),
        Arc::new(FakeRecognizer::default()),
    );
    let out = p.convert(&scanned("seq.pdf", 3)).await.unwrap();
    assert_eq!(out.extraction.pages(), ["page 1", "page 2", "page 3"]);
}

// ── Idempotence ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn converting_twice_gives_the_same_extraction() {
    let p = pipeline(
        config(),
        Arc::new(FakeRasterizer::new(2)),
        Arc::new(FakeRecognizer::default()),
    );

    let text = source("t.pdf", &[Some("Alpha"), Some("Beta")]);
    let a = p.convert(&text).await.unwrap();
    let b = p.convert(&text).await.unwrap();
    assert_eq!(a.extraction, b.extraction);
    assert_eq!(a.document.paragraphs, b.document.paragraphs);

    let scan = scanned("s.pdf", 2);
    let c = p.convert(&scan).await.unwrap();
    let d = p.convert(&scan).await.unwrap();
    assert_eq!(c.extraction, d.extraction);
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    started: AtomicUsize,
    fallback: AtomicBool,
    strategy: Mutex<Option<Strategy>>,
    pages_done: AtomicUsize,
    completed: AtomicUsize,
}

impl ConversionProgressCallback for Recorder {
    fn on_conversion_start(&self, total_pages: usize) {
        self.started.store(total_pages, Ordering::SeqCst);
    }

    fn on_strategy_selected(&self, strategy: Strategy, fallback: bool) {
        *self.strategy.lock().unwrap() = Some(strategy);
        self.fallback.store(fallback, Ordering::SeqCst);
    }

    fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _text_len: usize) {
        self.pages_done.fetch_add(1, Ordering::SeqCst);
    }

    fn on_conversion_complete(&self, total_pages: usize, _strategy: Strategy) {
        self.completed.store(total_pages, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_reports_ocr_fallback() {
    let recorder = Arc::new(Recorder::default());
    let cfg = ConversionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let p = pipeline_with_text(
        cfg,
        Arc::new(BrokenTextLayer),
        Arc::new(FakeRasterizer::new(3)),
        Arc::new(FakeRecognizer::default()),
    );

    p.convert(&scanned("p.pdf", 3)).await.unwrap();

    assert_eq!(recorder.started.load(Ordering::SeqCst), 3);
    assert_eq!(*recorder.strategy.lock().unwrap(), Some(Strategy::Ocr));
    assert!(recorder.fallback.load(Ordering::SeqCst));
    assert_eq!(recorder.pages_done.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn progress_on_text_path_has_no_page_events() {
    let recorder = Arc::new(Recorder::default());
    let cfg = ConversionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let p = pipeline(
        cfg,
        Arc::new(FakeRasterizer::new(1)),
        Arc::new(FakeRecognizer::default()),
    );

    p.convert(&source("t.pdf", &[Some("x")])).await.unwrap();

    assert_eq!(*recorder.strategy.lock().unwrap(), Some(Strategy::TextLayer));
    assert!(!recorder.fallback.load(Ordering::SeqCst));
    assert_eq!(recorder.pages_done.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 1);
}

// ── File output ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn convert_to_file_writes_a_readable_docx() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Relatorio.pdf");
    std::fs::write(&input, build_pdf(&[Some("Hello World")])).unwrap();
    let output = dir.path().join("out").join("Relatorio.docx");

    let p = pipeline(
        config(),
        Arc::new(FakeRasterizer::new(1)),
        Arc::new(FakeRecognizer::default()),
    );
    let out = p
        .convert_to_file(input.to_str().unwrap(), &output)
        .await
        .unwrap();

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written, out.document.bytes);
    assert_eq!(docx_paragraphs(&written), vec!["Hello World"]);
    assert_eq!(out.stats.output_bytes, written.len());
}

#[tokio::test]
async fn non_pdf_input_file_is_rejected_before_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.pdf");
    std::fs::write(&input, b"\x89PNG\r\n\x1a\n").unwrap();

    let recognizer = Arc::new(FakeRecognizer::default());
    let p = pipeline(config(), Arc::new(FakeRasterizer::new(1)), recognizer.clone());
    let err = p.convert_input(input.to_str().unwrap()).await.unwrap_err();

    assert!(matches!(err, Pdf2DocxError::NotAPdf { .. }), "got {err:?}");
    assert_eq!(recognizer.calls(), 0);
}
