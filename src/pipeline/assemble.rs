//! Document assembly: page texts → `.docx` bytes.
//!
//! Layout depends on where the text came from:
//!
//! - text layer: one paragraph per page, in page order;
//! - OCR: one paragraph per page with an empty paragraph between
//!   consecutive pages, so page boundaries stay visible after editing.
//!
//! Inside a paragraph, `\n` becomes a line break and `\t` a tab run element.
//! Characters XML 1.0 cannot carry (most C0 controls, U+FFFE, U+FFFF) are
//! dropped; leaving them in produces a file Word refuses to open.

use crate::error::Pdf2DocxError;
use crate::output::{ExtractionResult, OutputDocument, Strategy};
use docx_rs::{BreakType, Docx, Paragraph, Run};
use std::io::Cursor;
use tracing::debug;

/// Builds the output document from an [`ExtractionResult`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentAssembler;

impl DocumentAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Lay out the extracted pages as paragraphs and serialise the package.
    pub fn assemble(&self, extraction: &ExtractionResult) -> Result<OutputDocument, Pdf2DocxError> {
        let paragraphs = layout(extraction);

        let docx = paragraphs
            .iter()
            .fold(Docx::new(), |docx, text| docx.add_paragraph(paragraph(text)));

        let mut buf = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buf)
            .map_err(|e| Pdf2DocxError::Assembly {
                detail: e.to_string(),
            })?;
        let bytes = buf.into_inner();

        debug!(
            "Assembled {} paragraphs from {} pages ({}) → {} bytes",
            paragraphs.len(),
            extraction.page_count(),
            extraction.strategy(),
            bytes.len()
        );

        Ok(OutputDocument {
            bytes,
            strategy: extraction.strategy(),
            paragraphs,
        })
    }
}

/// Paragraph texts, in document order, for an extraction.
fn layout(extraction: &ExtractionResult) -> Vec<String> {
    let pages = extraction.pages().iter().map(|p| sanitize(p));
    match extraction.strategy() {
        Strategy::TextLayer => pages.collect(),
        Strategy::Ocr => {
            let mut out = Vec::with_capacity(extraction.page_count() * 2);
            for (i, page) in pages.enumerate() {
                if i > 0 {
                    out.push(String::new());
                }
                out.push(page);
            }
            out
        }
    }
}

fn paragraph(text: &str) -> Paragraph {
    if text.is_empty() {
        return Paragraph::new();
    }

    let mut run = Run::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        for (j, segment) in line.split('\t').enumerate() {
            if j > 0 {
                run = run.add_tab();
            }
            if !segment.is_empty() {
                run = run.add_text(segment);
            }
        }
    }
    Paragraph::new().add_run(run)
}

/// Normalise line endings and drop characters that are not legal XML 1.0.
fn sanitize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|&c| is_xml_char(c))
        .collect()
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
