//! Post-processing: deterministic cleanup of OCR transcripts.
//!
//! Tesseract output carries artefacts that are harmless in a terminal but
//! show up in a word processor: a form feed after every page, CRLF line
//! endings on some builds, runs of empty lines where it detected large
//! vertical gaps, and the occasional zero-width character lifted from the
//! glyph classifier.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule only has to deal
//! with `\n`; trailing whitespace is trimmed before blank-line collapsing so
//! lines holding only spaces count as blank.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw OCR transcript.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Drop form feeds and other page-control characters
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 4. Trim trailing whitespace per line
/// 5. Collapse runs of blank lines into a single blank line
/// 6. Trim leading and trailing blank lines
///
/// A page with nothing recognisable comes out as the empty string.
pub fn clean_transcript(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_page_controls(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    trim_blank_edges(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Drop page-control characters ─────────────────────────────────────

fn remove_page_controls(input: &str) -> String {
    input
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect()
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 6: Trim blank edges ─────────────────────────────────────────────────

fn trim_blank_edges(input: &str) -> String {
    input.trim_matches('\n').to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
