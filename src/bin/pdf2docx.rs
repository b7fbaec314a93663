//! CLI binary for pdf2docx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and writes the `.docx`.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2docx::pipeline::input::default_output_path;
use pdf2docx::{
    ConversionConfig, ConversionPipeline, ConversionProgressCallback, ProgressCallback, Strategy,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner while the text layer is probed, then a bar
/// over OCR pages, which may complete out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    total: AtomicUsize,
    recognised: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading text layer…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
            recognised: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Recognising");
        self.bar.reset_eta();
    }

    fn page_elapsed(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.total.store(total_pages, Ordering::SeqCst);
        self.bar.set_message(format!("{total_pages} pages"));
    }

    fn on_strategy_selected(&self, strategy: Strategy, fallback: bool) {
        match strategy {
            Strategy::TextLayer => {
                self.bar.println(format!("{} {}", cyan("◆"), bold("Text layer found")));
            }
            Strategy::Ocr => {
                let reason = if fallback {
                    "text layer unreadable, running OCR"
                } else {
                    "no text layer, running OCR"
                };
                self.bar.println(format!("{} {}", cyan("◆"), bold(reason)));
                self.activate_bar(self.total.load(Ordering::SeqCst));
            }
        }
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let elapsed = self.page_elapsed(page_num);
        self.recognised.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.page_elapsed(page_num);
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
    }

    fn on_conversion_complete(&self, total_pages: usize, strategy: Strategy) {
        self.bar.finish_and_clear();
        let detail = match strategy {
            Strategy::TextLayer => "from the text layer".to_string(),
            Strategy::Ocr => format!(
                "via OCR ({} recognised)",
                self.recognised.load(Ordering::SeqCst)
            ),
        };
        eprintln!(
            "{} {} pages converted {}",
            green("✔"),
            bold(&total_pages.to_string()),
            detail
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert next to the input (writes contrato.docx)
  pdf2docx contrato.pdf

  # Choose the output path
  pdf2docx scan.pdf -o out/scan.docx

  # English scan, higher resolution
  pdf2docx --lang eng --dpi 400 scan.pdf

  # Ignore a broken text layer
  pdf2docx --force-ocr garbled.pdf

  # Convert from URL, print stats as JSON
  pdf2docx https://example.com/files/report.pdf --json

ENVIRONMENT VARIABLES:
  PDF2DOCX_LANG         OCR language(s), e.g. por, eng, por+eng
  PDF2DOCX_TESSERACT    Path to the tesseract executable
  PDF2DOCX_PDFIUM_LIB   Directory or file of the pdfium shared library
  RUST_LOG              Log filter, overrides -v / -q

SETUP:
  Both OCR backends are checked at startup:
    - tesseract with language data   (apt install tesseract-ocr tesseract-ocr-por)
    - the pdfium shared library      (https://github.com/bblanchon/pdfium-binaries)
"#;

/// Convert PDF files and URLs to editable DOCX documents.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2docx",
    version,
    about = "Convert PDF files and URLs to editable DOCX documents",
    long_about = "Convert PDF documents (local files or URLs) to Word documents. \
PDFs with a text layer are converted directly; scanned PDFs are rendered and run \
through tesseract OCR.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the DOCX here instead of next to the input.
    #[arg(short, long, env = "PDF2DOCX_OUTPUT")]
    output: Option<PathBuf>,

    /// OCR language(s) as tesseract codes, joined with '+'.
    #[arg(short, long, env = "PDF2DOCX_LANG", default_value = "por")]
    lang: String,

    /// Rendering DPI for OCR (72–600).
    #[arg(long, env = "PDF2DOCX_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Path to the tesseract executable.
    #[arg(long, env = "PDF2DOCX_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Directory (or file) of the pdfium shared library.
    #[arg(long, env = "PDF2DOCX_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "PDF2DOCX_PSM",
          value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: Option<u8>,

    /// Pages rendered and recognised at once.
    #[arg(short, long, env = "PDF2DOCX_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Per-page rasterisation / recognition timeout in seconds.
    #[arg(long, env = "PDF2DOCX_PAGE_TIMEOUT", default_value_t = 120)]
    page_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2DOCX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Skip the text layer and always run OCR.
    #[arg(long, env = "PDF2DOCX_FORCE_OCR")]
    force_ocr: bool,

    /// Print conversion stats as JSON on stdout.
    #[arg(long, env = "PDF2DOCX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2DOCX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2DOCX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2DOCX_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config and pipeline ────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let pipeline = tokio::task::block_in_place(|| ConversionPipeline::new(config))
        .context("OCR backends are not available")?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let output = pipeline
        .convert_to_file(&cli.input, &output_path)
        .await
        .with_context(|| format!("Conversion of '{}' failed", cli.input))?;
    let stats = &output.stats;

    if cli.json {
        let json = serde_json::to_string_pretty(stats).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {} pages  {}  {}ms  →  {}",
            green("✔"),
            stats.total_pages,
            stats.strategy,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        if let Some(ref reason) = stats.fallback_reason {
            eprintln!("   {} {}", cyan("⚠"), dim(&format!("OCR fallback: {reason}")));
        }
        if stats.empty_pages > 0 {
            eprintln!(
                "   {}",
                dim(&format!("{} pages without text", stats.empty_pages))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .language(&cli.lang)
        .tesseract_path(&cli.tesseract)
        .concurrency(cli.concurrency)
        .page_timeout_secs(cli.page_timeout)
        .download_timeout_secs(cli.download_timeout)
        .force_ocr(cli.force_ocr);

    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    if let Some(psm) = cli.psm {
        builder = builder.page_segmentation_mode(psm);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
