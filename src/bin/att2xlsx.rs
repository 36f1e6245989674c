//! CLI binary for edgequake-attendance.
//!
//! A thin shim over the library crate: resolves the API key once, maps CLI
//! flags to `ExtractionConfig`, shows a spinner while the model reads the
//! sheet, prints the table and writes the workbook.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_attendance::credential::requires_credential;
use edgequake_attendance::display::render_markdown;
use edgequake_attendance::{
    build_table, extract_to_file, resolve_credential, AttendanceError, ColumnOrder, Credential,
    CredentialPrompt, ExtractionConfig, ExtractionProgressCallback, MalformedExtraction,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
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
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Busy spinner using indicatif ─────────────────────────────────────────────

struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading image…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_inference_start(&self, image_bytes: usize) {
        self.bar.set_prefix("Reading");
        self.bar.set_message(format!(
            "handwriting ({:.1} KB image)…",
            image_bytes as f64 / 1024.0
        ));
    }

    fn on_inference_complete(&self, response_chars: usize) {
        self.bar.set_prefix("Parsing");
        self.bar.set_message(format!("{response_chars} chars"));
    }

    fn on_extraction_complete(&self, _rows: usize) {
        self.bar.finish_and_clear();
    }

    fn on_extraction_error(&self, _error: &str) {
        self.bar.finish_and_clear();
    }
}

// ── Interactive key prompt ───────────────────────────────────────────────────

/// Reads one line from stdin. Only offered when stdin is a terminal.
struct StdinPrompt;

impl CredentialPrompt for StdinPrompt {
    fn prompt(&self, message: &str) -> io::Result<Option<String>> {
        eprint!("{message}");
        io::stderr().flush()?;
        let mut line = String::new();
        let n = io::stdin().lock().read_line(&mut line)?;
        Ok((n > 0).then_some(line))
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Read a photographed sheet, write VKT_BangChamCong_<YYYYMMDD>.xlsx here
  att2xlsx bang_cham_cong.jpg

  # Write into a directory, keep the 35 canonical columns in order
  att2xlsx --canonical-columns -o exports/ sheet.png

  # Use another vision provider
  att2xlsx --provider openai --model gpt-4.1 --api-key sk-... sheet.jpg

  # Print the parsed rows as JSON
  att2xlsx --json sheet.jpg > rows.json

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY          Gemini API key (checked first)
  GEMINI_API_KEY          Gemini API key (fallback)
  OPENAI_API_KEY          Key for --provider openai
  ANTHROPIC_API_KEY       Key for --provider anthropic
  OPENROUTER_API_KEY      Key for --provider openrouter
  EDGEQUAKE_PROVIDER      Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID

  When no key is set and stdin is a terminal, the key is asked for once.
  It is never stored.
"#;

/// Convert photographs of handwritten attendance sheets to Excel.
#[derive(Parser, Debug)]
#[command(
    name = "att2xlsx",
    version,
    about = "Convert a photographed handwritten attendance sheet to an Excel workbook",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JPEG/PNG file path or HTTP/HTTPS URL.
    input: String,

    /// Directory to write the workbook into.
    #[arg(short, long, env = "ATT2XLSX_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// API key for the inference service. Defaults to the provider's own
    /// key variable.
    #[arg(long)]
    api_key: Option<String>,

    /// LLM provider: gemini, openai, anthropic, mistral, ollama.
    #[arg(long, env = "EDGEQUAKE_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Vision model ID (default depends on the provider).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// File-name prefix; the date is appended.
    #[arg(long, env = "ATT2XLSX_PREFIX", default_value = "VKT_BangChamCong")]
    prefix: String,

    /// Worksheet name.
    #[arg(long, env = "ATT2XLSX_SHEET", default_value = "ChamCong")]
    sheet: String,

    /// Always emit the 35 canonical columns in schema order.
    #[arg(long)]
    canonical_columns: bool,

    /// Path to a text file containing a custom extraction instruction.
    #[arg(long)]
    instruction: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, default_value_t = 0.1)]
    temperature: f32,

    /// HTTP download timeout in seconds.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Print the parsed rows as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && io::stderr().is_terminal();
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

    // ── Credential (resolved once, before the pipeline) ──────────────────
    let credential = if requires_credential(&cli.provider) {
        let trusted = cli
            .api_key
            .clone()
            .and_then(Credential::new)
            .or_else(|| Credential::from_env(&cli.provider));
        let prompt: Option<&dyn CredentialPrompt> = if io::stdin().is_terminal() {
            Some(&StdinPrompt)
        } else {
            None
        };
        match resolve_credential(&cli.provider, trusted, prompt) {
            Ok((c, _source)) => Some(c),
            Err(e) => {
                eprintln!("{} {}", red("✘"), e);
                return Ok(ExitCode::from(1));
            }
        }
    } else {
        None
    };

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        None
    };

    let config = build_config(&cli, credential, progress).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    match extract_to_file(&cli.input, &cli.output_dir, &config).await {
        Ok((path, output)) => {
            if cli.json {
                let json = serde_json::to_string_pretty(&output.result)
                    .context("Failed to serialise rows")?;
                println!("{json}");
            } else if !cli.quiet {
                let table = build_table(&output.result, config.column_order);
                print!("{}", render_markdown(&table));
            }
            if !cli.quiet {
                eprintln!(
                    "{} {} rows extracted  {}ms  →  {}",
                    green("✔"),
                    bold(&output.result.len().to_string()),
                    output.total_duration_ms,
                    bold(&path.display().to_string()),
                );
                eprintln!(
                    "   {} tokens in  /  {} tokens out",
                    dim(&output.response.input_tokens.to_string()),
                    dim(&output.response.output_tokens.to_string()),
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(AttendanceError::Malformed(m)) => {
            report_malformed(&m);
            Ok(ExitCode::from(2))
        }
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            Ok(ExitCode::from(1))
        }
    }
}

/// Failure summary plus the raw response, the CLI's "details" panel.
fn report_malformed(m: &MalformedExtraction) {
    eprintln!(
        "{} {}",
        red("⚠"),
        bold("The model could not read this image, or the photo is too blurry.")
    );
    eprintln!("  {}", dim(&m.detail));
    eprintln!("{}", dim("── raw response ────────────────────────────────"));
    eprintln!("{}", m.raw);
    eprintln!("{}", dim("────────────────────────────────────────────────"));
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(
    cli: &Cli,
    credential: Option<Credential>,
    progress: Option<ProgressCallback>,
) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .provider_name(cli.provider.clone())
        .file_prefix(cli.prefix.clone())
        .sheet_name(cli.sheet.clone())
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .column_order(if cli.canonical_columns {
            ColumnOrder::Canonical
        } else {
            ColumnOrder::Observed
        });

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref path) = cli.instruction {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(text);
    }
    if let Some(c) = credential {
        builder = builder.credential(c);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
