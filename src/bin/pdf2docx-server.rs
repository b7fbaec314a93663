//! HTTP upload server for pdf2docx.
//!
//! Serves the upload form on `/` and converts posted PDFs on `/convert`.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2docx::server::router_with_limit;
use pdf2docx::{ConversionConfig, ConversionPipeline};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Serve the PDF → DOCX upload form over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2docx-server",
    version,
    about = "Serve the PDF to DOCX upload form over HTTP",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// Address to listen on.
    #[arg(short, long, env = "PDF2DOCX_BIND", default_value = "0.0.0.0:5000")]
    bind: SocketAddr,

    /// Largest accepted upload in megabytes.
    #[arg(long, env = "PDF2DOCX_MAX_UPLOAD_MB", default_value_t = 100)]
    max_upload_mb: usize,

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

    /// OCR pages processed at once, per request.
    #[arg(short, long, env = "PDF2DOCX_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Per-page rasterisation / recognition timeout in seconds.
    #[arg(long, env = "PDF2DOCX_PAGE_TIMEOUT", default_value_t = 120)]
    page_timeout: u64,

    /// Skip the text layer and always run OCR.
    #[arg(long, env = "PDF2DOCX_FORCE_OCR")]
    force_ocr: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2DOCX_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let pipeline = tokio::task::block_in_place(|| ConversionPipeline::new(config))
        .context("OCR backends are not available")?;

    let app = router_with_limit(Arc::new(pipeline), cli.max_upload_mb * 1024 * 1024);

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    info!("Listening on http://{}", cli.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        // Without a signal handler, run until killed.
        Err(_) => std::future::pending::<()>().await,
    }
}

fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .language(&cli.lang)
        .tesseract_path(&cli.tesseract)
        .concurrency(cli.concurrency)
        .page_timeout_secs(cli.page_timeout)
        .force_ocr(cli.force_ocr);

    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    if let Some(psm) = cli.psm {
        builder = builder.page_segmentation_mode(psm);
    }

    builder.build().context("Invalid configuration")
}
