//! CLI binary for docustructure.
//!
//! A thin shim over the library crate: maps CLI flags to
//! `ConversionConfig`, drives one `Session` and prints the chosen view.

use anyhow::{Context, Result};
use clap::Parser;
use docustructure::render::{self, View};
use docustructure::{
    output, pipeline::input, save_document, ConversionConfig, ConversionProgressCallback,
    ProgressCallback, Selection, Session, SessionState, StructuredDocument,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner shown while the model reads the document. Retries caused by an
/// overloaded endpoint are printed above it.
///
/// Nothing is drawn until a conversion actually starts.
struct CliProgressCallback {
    bar: ProgressBar,
    started: AtomicBool,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        Arc::new(Self {
            bar,
            started: AtomicBool::new(false),
        })
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Remove the spinner, e.g. when the run ends before a conversion.
    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, filename: &str, size_bytes: usize) {
        if !self.started.swap(true, Ordering::SeqCst) {
            self.bar.enable_steady_tick(Duration::from_millis(80));
        }
        self.bar.set_prefix("Analyzing");
        self.bar.set_message(format!(
            "{filename} {}",
            dim(&format!("({:.1} KB)", size_bytes as f64 / 1024.0))
        ));
    }

    fn on_attempt_start(&self, attempt: u32, max_retries: u32) {
        if attempt > 0 {
            self.bar.set_prefix(format!("Attempt {}/{}", attempt + 1, max_retries + 1));
        }
    }

    fn on_retry_scheduled(&self, attempt: u32, max_retries: u32, delay: Duration) {
        self.bar.println(format!(
            "  {} Server busy, retrying ({attempt}/{max_retries}) in {:.0}s",
            yellow("⟳"),
            delay.as_secs_f64()
        ));
    }

    fn on_conversion_complete(&self, document: &StructuredDocument) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(&document.metadata.filename),
            dim(&format!(
                "{} table(s), {} key point(s)",
                document.structured_content.tables.len(),
                document.document_analysis.key_points.len()
            )),
        );
    }

    fn on_conversion_error(&self, _error: &str) {
        self.clear();
    }
}

/// Shown with a missing-credential failure when no key was passed in.
const MISSING_KEY_HINT: &str = "Set GEMINI_API_KEY or pass --api-key <KEY>.";

fn has_api_key(key: Option<&str>) -> bool {
    key.is_some_and(|k| !k.trim().is_empty())
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summary, key points and tables (stdout)
  docustructure report.pdf

  # Full Markdown
  docustructure --view markdown report.pdf

  # Save as report_ai_ready.json in the current directory
  docustructure --save report.pdf

  # Save to a chosen path and print the JSON
  docustructure --view json -o out/report.json report.pdf

  # Convert from URL
  docustructure https://arxiv.org/pdf/1706.03762

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY              Google Gemini API key (required)
  DOCUSTRUCTURE_MODEL         Override model ID
  DOCUSTRUCTURE_ENDPOINT      Override REST endpoint
  RUST_LOG                    Log filter (overrides --verbose/--quiet)

RETRIES:
  When the model endpoint reports it is overloaded (HTTP 503 / UNAVAILABLE)
  the request is resubmitted after 1s, 2s and 4s. Any other error stops the
  conversion immediately.
"#;

/// Convert a PDF into a structured, AI-ready JSON document.
#[derive(Parser, Debug)]
#[command(
    name = "docustructure",
    version,
    about = "Convert a PDF into a structured, AI-ready JSON document",
    long_about = "Send a PDF to a multimodal model and get back its title, summary, key points, \
full Markdown content and every table as headers and rows.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// API key for the inference endpoint.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model ID.
    #[arg(long, env = "DOCUSTRUCTURE_MODEL", default_value = docustructure::config::DEFAULT_MODEL)]
    model: String,

    /// REST endpoint base URL.
    #[arg(long, env = "DOCUSTRUCTURE_ENDPOINT", default_value = docustructure::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Retries when the endpoint is overloaded (0–10).
    #[arg(long, env = "DOCUSTRUCTURE_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-attempt timeout in seconds (0 disables).
    #[arg(long, env = "DOCUSTRUCTURE_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Sampling temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "DOCUSTRUCTURE_TEMPERATURE")]
    temperature: Option<f32>,

    /// Path to a text file replacing the built-in extraction instruction.
    #[arg(long, env = "DOCUSTRUCTURE_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// What to print on success.
    #[arg(long, env = "DOCUSTRUCTURE_VIEW", value_enum, default_value = "summary")]
    view: ViewArg,

    /// Save the document as `<stem>_ai_ready.json` in the current directory.
    #[arg(long, env = "DOCUSTRUCTURE_SAVE")]
    save: bool,

    /// Save the document to this path.
    #[arg(short, long, env = "DOCUSTRUCTURE_OUTPUT")]
    output: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long, env = "DOCUSTRUCTURE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCUSTRUCTURE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the document itself.
    #[arg(short, long, env = "DOCUSTRUCTURE_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "DOCUSTRUCTURE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ViewArg {
    Summary,
    Markdown,
    Json,
}

impl From<ViewArg> for View {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::Summary => View::Summary,
            ViewArg::Markdown => View::Markdown,
            ViewArg::Json => View::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what INFO logs would say, so they are hidden
    // while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Load input ───────────────────────────────────────────────────────
    let file = input::resolve_input(&cli.input, cli.download_timeout)
        .await
        .with_context(|| format!("Failed to load {}", cli.input))?;

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);
    let config = build_config(&cli, progress_cb).await?;

    // ── Run session ──────────────────────────────────────────────────────
    let mut session = Session::new();
    if let Selection::Rejected(msg) = session.submit(file, &config).await {
        if let Some(ref cb) = spinner {
            cb.clear();
        }
        anyhow::bail!("{msg}");
    }

    let document = match session.state() {
        SessionState::Success(doc) => doc.as_ref(),
        SessionState::Error(msg) => {
            let err = anyhow::anyhow!("{} {msg}", red("✘"));
            return Err(if has_api_key(cli.api_key.as_deref()) {
                err
            } else {
                err.context(MISSING_KEY_HINT)
            });
        }
        other => anyhow::bail!("Conversion ended in unexpected state '{}'", other.name()),
    };

    // ── Print view ───────────────────────────────────────────────────────
    let text = render::render(document, cli.view.into()).context("Failed to render document")?;
    {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    // ── Save ─────────────────────────────────────────────────────────────
    let save_path = match (&cli.output, cli.save) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from(output::save_file_name(&document.metadata.filename))),
        (None, false) => None,
    };
    if let Some(path) = save_path {
        save_document(document, &path)
            .await
            .with_context(|| format!("Failed to save {}", path.display()))?;
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let instruction = if let Some(ref path) = cli.instruction {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read instruction from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ConversionConfig::builder()
        .model(cli.model.as_str())
        .endpoint(cli.endpoint.as_str())
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.as_str());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(text) = instruction {
        builder = builder.instruction(text);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
