//! CLI binary for edgequake-tldr.
//!
//! A thin shim over the library crate: flags map to `SummarizerConfig`,
//! one-shot mode calls `summarize_file`, `--interactive` drives a `Session`.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_tldr::summarize::write_atomic;
use edgequake_tldr::{
    copy_text, extract_file, render, summarize_file, to_ansi, FileId, LengthTier, ProgressCallback,
    Session, SummarizerBackend, SummarizerConfig, SummaryProgressCallback, UploadReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner shown while a file is extracted or a summary generated.
///
/// A fresh bar is created for each operation so the same callback serves
/// every command of an interactive session.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
            started: Mutex::new(None),
        })
    }

    fn start(&self, prefix: &str, msg: String) {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(prefix.to_string());
        bar.set_message(msg);
        bar.enable_steady_tick(Duration::from_millis(80));

        *self.started.lock().unwrap() = Some(Instant::now());
        if let Some(old) = self.bar.lock().unwrap().replace(bar) {
            old.finish_and_clear();
        }
    }

    /// Clear the spinner and print `line` in its place.
    fn stop(&self, line: String) {
        let elapsed = self
            .started
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
        eprintln!("{line}  {}", dim(&format!("{elapsed:.1}s")));
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, file_name: &str, kind: &str) {
        let how = if kind == "image" { "OCR" } else { "text layer" };
        self.start("Extracting", format!("{file_name} ({how})"));
    }

    fn on_extraction_complete(&self, file_name: &str, text_len: usize) {
        self.stop(format!(
            "{} {}  {}",
            green("✓"),
            file_name,
            dim(&format!("{text_len} chars"))
        ));
    }

    fn on_generation_start(&self, word_limit: usize, highlight: bool) {
        let extra = if highlight { ", key points" } else { "" };
        self.start("Summarising", format!("~{word_limit} words{extra}"));
    }

    fn on_generation_complete(&self, summary_len: usize) {
        self.stop(format!(
            "{} summary ready  {}",
            green("✓"),
            dim(&format!("{summary_len} chars"))
        ));
    }

    fn on_generation_error(&self, error: &str) {
        // Keep the line short; the full error is reported by the caller.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.stop(format!("{} {}", red("✗"), red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Medium-length summary (stdout)
  tldr report.pdf

  # Short summary with bullet key points
  tldr --length short --highlight report.pdf

  # Summarise a scanned page (OCR)
  tldr --ocr-lang deu scan.png

  # Plain text for pasting elsewhere, written to a file
  tldr --plain report.pdf -o summary.txt

  # Only extract the text (no API key needed)
  tldr --extract-only report.pdf

  # Summarise from a URL
  tldr https://arxiv.org/pdf/1706.03762

  # Try it without an LLM
  tldr --offline report.pdf

  # Interactive session: regenerate with other lengths, manage files
  tldr --interactive report.pdf scan.png

LENGTHS:
  short   ≈ 50 words
  medium  ≈ 100 words (default)
  long    ≈ 200 words

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (preferred when set)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  PDFIUM_AUTO_CACHE_DIR   Where a downloaded libpdfium is cached
  TESSERACT_PATH          Path to the tesseract executable

SETUP:
  1. Set API key:   export GEMINI_API_KEY=...
  2. Summarise:     tldr document.pdf

  PDF text needs the pdfium shared library. It is looked up via
  --pdfium-lib, PDFIUM_LIB_PATH, ./, the cache and the system install, and
  downloaded once (~30 MB) when none is found. Images need the tesseract
  binary on PATH.
"#;

/// Summarise PDFs and images with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "tldr",
    version,
    about = "Summarise PDF files, images and URLs with an LLM",
    long_about = "Extract the text of a PDF (pdfium) or an image (tesseract OCR) and summarise it \
with an LLM in a short, medium or long form, optionally highlighting key points as bullets. \
Supports Google Gemini, OpenAI, Anthropic and any provider edgequake-llm can reach.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs (PDF or image).
    #[arg(required_unless_present = "interactive")]
    inputs: Vec<String>,

    /// Write the plain summary to this file instead of stdout.
    #[arg(short, long, env = "TLDR_OUTPUT")]
    output: Option<PathBuf>,

    /// Summary length.
    #[arg(short, long, env = "TLDR_LENGTH", value_enum, default_value = "medium")]
    length: LengthArg,

    /// Ask for key points as bullets and show bold spans.
    #[arg(long, env = "TLDR_HIGHLIGHT")]
    highlight: bool,

    /// Use the offline placeholder summariser (no network, no API key).
    #[arg(long, env = "TLDR_OFFLINE")]
    offline: bool,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "TLDR_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: gemini, openai, anthropic, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "TLDR_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "TLDR_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "TLDR_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Tesseract language model(s), e.g. eng or eng+deu.
    #[arg(long, env = "TLDR_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// libpdfium file or directory. Skips the automatic download.
    #[arg(long, env = "TLDR_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "TLDR_PASSWORD")]
    password: Option<String>,

    /// Upload limit in MiB.
    #[arg(long, env = "TLDR_MAX_FILE_MB", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    max_file_mb: u64,

    /// LLM call timeout in seconds (default: none).
    #[arg(long, env = "TLDR_API_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "TLDR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the extracted text only, no summary.
    #[arg(long, conflicts_with = "interactive")]
    extract_only: bool,

    /// Print the summary as plain prose (no bullets or bold markers).
    #[arg(long, env = "TLDR_PLAIN")]
    plain: bool,

    /// Output structured JSON instead of text.
    #[arg(long, env = "TLDR_JSON", conflicts_with = "interactive")]
    json: bool,

    /// Start an interactive session.
    #[arg(short, long)]
    interactive: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "TLDR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TLDR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TLDR_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LengthArg {
    Short,
    Medium,
    Long,
}

impl From<LengthArg> for LengthTier {
    fn from(v: LengthArg) -> Self {
        match v {
            LengthArg::Short => LengthTier::Short,
            LengthArg::Medium => LengthTier::Medium,
            LengthArg::Long => LengthTier::Long,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs.
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

    // ── Ensure the PDF engine is available ───────────────────────────────
    // On the very first run without a local libpdfium this downloads it
    // (~30 MB) into the per-user cache; later runs only check the path.
    if needs_pdfium(&cli) && cli.pdfium_lib.is_none() && !pdfium_auto::is_pdfium_available() {
        prepare_pdfium(show_progress)?;
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SummaryProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    if cli.interactive {
        return run_interactive(&cli, &config).await;
    }

    if cli.output.is_some() && cli.inputs.len() > 1 {
        anyhow::bail!("--output takes a single input ({} given)", cli.inputs.len());
    }

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        for input in &cli.inputs {
            let result = extract_file(input, &config)
                .await
                .with_context(|| format!("Failed to extract '{input}'"))?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result).context("Failed to serialise output")?
                );
            } else {
                print_header(&cli, input);
                print_stdout(&result.text)?;
            }
        }
        return Ok(());
    }

    // ── Summarise ────────────────────────────────────────────────────────
    for input in &cli.inputs {
        let output = summarize_file(input, &config)
            .await
            .with_context(|| format!("Summary of '{input}' failed"))?;

        if let Some(ref path) = cli.output {
            write_atomic(path, &copy_text(&output.summary.text))
                .await
                .context("Failed to write summary")?;
            if !cli.quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
            }
        } else if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            print_header(&cli, input);
            print_stdout(&format_summary(&output.summary.text, output.summary.highlight, cli.plain))?;
        }

        if !cli.quiet && !cli.json {
            eprintln!(
                "   {} tokens in  /  {} tokens out  —  {}ms total",
                dim(&output.stats.total_input_tokens.to_string()),
                dim(&output.stats.total_output_tokens.to_string()),
                output.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `SummarizerConfig`.
/// Whether any input may be a PDF. Local images never touch pdfium.
fn needs_pdfium(cli: &Cli) -> bool {
    cli.interactive
        || cli.inputs.iter().any(|input| {
            let lower = input.to_ascii_lowercase();
            lower.starts_with("http://") || lower.starts_with("https://") || lower.ends_with(".pdf")
        })
}

fn prepare_pdfium(show_progress: bool) -> Result<()> {
    if !show_progress {
        // Download silently; errors still propagate.
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None, None))
            .context("Failed to download the PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    // block_in_place keeps the borrowed callback valid without a 'static bound.
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(
            None,
            Some(&|downloaded, total| {
                if let Some(t) = total {
                    if bar.length() != Some(t) {
                        bar.set_length(t);
                    }
                }
                bar.set_position(downloaded);
            }),
        )
    })
    .context("Failed to download the PDFium engine")?;

    dl_bar.finish_and_clear();
    eprintln!("{} PDF engine ready", green("✓"));
    Ok(())
}

async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummarizerConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = SummarizerConfig::builder()
        .backend(if cli.offline {
            SummarizerBackend::Stub
        } else {
            SummarizerBackend::Live
        })
        .length(cli.length.into())
        .highlight(cli.highlight)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .ocr_language(cli.ocr_lang.clone())
        .max_file_bytes(cli.max_file_mb * 1024 * 1024)
        .download_timeout_secs(cli.download_timeout);

    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn format_summary(summary: &str, highlight: bool, plain: bool) -> String {
    if plain || !io::stdout().is_terminal() {
        copy_text(summary)
    } else {
        to_ansi(&render(summary, highlight))
    }
}

fn print_header(cli: &Cli, input: &str) {
    if cli.inputs.len() > 1 && !cli.quiet {
        eprintln!("\n{} {}", cyan("◆"), bold(input));
    }
}

fn print_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

// ── Interactive session ──────────────────────────────────────────────────────

const INTERACTIVE_HELP: &str = "\
  generate            summarise the current text
  length <tier>       short | medium | long
  highlight on|off    bullet key points and bold spans
  retry               re-extract the active file
  upload <input>...   add files or URLs (the first is extracted)
  files               list uploaded files
  rename <id> <name>  rename a file
  remove <id>         remove a file
  text                show the extracted text
  show                show the current summary
  copy [file]         print the plain summary, or write it to a file
  state               show session state
  help                this list
  quit                leave";

async fn run_interactive(cli: &Cli, config: &SummarizerConfig) -> Result<()> {
    let mut session = Session::from_config(config).context("Failed to start session")?;

    if !cli.inputs.is_empty() {
        let report = session.upload_inputs(&cli.inputs[..]).await?;
        print_upload(&session, &report);
    }
    eprintln!("{}", dim("Type 'help' for commands."));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", cyan("tldr>"));
        io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        match cmd {
            "quit" | "exit" | "q" => break,
            "help" | "?" => eprintln!("{INTERACTIVE_HELP}"),
            "generate" | "g" => match session.generate().await {
                Ok(summary) => {
                    let text = format_summary(&summary.text, summary.highlight, cli.plain);
                    print_stdout(&text)?;
                }
                Err(e) => report_error(&e),
            },
            "length" => match args.first().map(|s| s.parse::<LengthTier>()) {
                Some(Ok(tier)) => match session.set_length(tier) {
                    Ok(()) => eprintln!("length: {} (~{} words)", tier, tier.word_limit()),
                    Err(e) => report_error(&e),
                },
                Some(Err(e)) => report_error(&e),
                None => eprintln!("length: {}", session.length()),
            },
            "highlight" => {
                let value = match args.first().copied() {
                    Some("on") => Some(true),
                    Some("off") => Some(false),
                    None => Some(!session.highlight()),
                    Some(other) => {
                        eprintln!("{} expected on or off, got '{other}'", red("✗"));
                        None
                    }
                };
                if let Some(v) = value {
                    match session.set_highlight(v) {
                        Ok(()) => eprintln!("highlight: {}", if v { "on" } else { "off" }),
                        Err(e) => report_error(&e),
                    }
                }
            }
            "retry" => match session.retry().await {
                Ok(result) => {
                    if !result.is_extracted() {
                        eprintln!("{} {}", red("✗"), result.text);
                    }
                }
                Err(e) => report_error(&e),
            },
            "upload" => {
                if args.is_empty() {
                    eprintln!("usage: upload <path|url>...");
                    continue;
                }
                match session.upload_inputs(&args).await {
                    Ok(report) => print_upload(&session, &report),
                    Err(e) => report_error(&e),
                }
            }
            "files" => print_files(&session),
            "rename" => match (args.first().and_then(|s| parse_id(s)), args.len() > 1) {
                (Some(id), true) => {
                    if let Err(e) = session.rename_file(id, args[1..].join(" ")) {
                        report_error(&e);
                    }
                }
                _ => eprintln!("usage: rename <id> <name>"),
            },
            "remove" | "rm" => match args.first().and_then(|s| parse_id(s)) {
                Some(id) => match session.remove_file(id) {
                    Ok(file) => eprintln!("removed {}", file.name),
                    Err(e) => report_error(&e),
                },
                None => eprintln!("usage: remove <id>"),
            },
            "text" => match session.extraction() {
                Some(result) => print_stdout(&result.text)?,
                None => eprintln!("{}", dim("nothing extracted yet")),
            },
            "show" => match session.summary() {
                Some(summary) => {
                    let text = format_summary(&summary.text, summary.highlight, cli.plain);
                    print_stdout(&text)?;
                }
                None => eprintln!("{}", dim("no summary yet")),
            },
            "copy" => match (session.copy_text(), args.first()) {
                (Some(text), Some(path)) => match write_atomic(Path::new(path), &text).await {
                    Ok(()) => eprintln!("{}  →  {}", green("✔"), bold(path)),
                    Err(e) => report_error(&e),
                },
                (Some(text), None) => print_stdout(&text)?,
                (None, _) => eprintln!("{}", dim("no summary yet")),
            },
            "state" => print_state(&session),
            other => eprintln!("{} unknown command '{other}' (try 'help')", red("✗")),
        }
    }
    Ok(())
}

fn parse_id(s: &str) -> Option<FileId> {
    s.trim_start_matches('#').parse().ok().map(FileId::from_raw)
}

fn report_error(e: &dyn std::fmt::Display) {
    eprintln!("{} {}", red("✗"), e);
}

fn print_upload(session: &Session, report: &UploadReport) {
    for r in &report.rejected {
        eprintln!("  {} {}  {}", red("✗"), r.name, dim(&r.error.to_string()));
    }
    if let Some(msg) = session.error() {
        eprintln!("{}", red(msg));
    }
    if let Some(ref result) = report.extraction {
        if !result.is_extracted() {
            eprintln!("{} {}", red("✗"), result.text);
        }
    }
}

fn print_files(session: &Session) {
    if session.files().is_empty() {
        eprintln!("{}", dim("no files"));
        return;
    }
    let active = session.active_file().map(|f| f.id);
    for f in session.files() {
        eprintln!(
            "{} #{:<4} {:<32} {:<18} {}",
            if Some(f.id) == active { "*" } else { " " },
            f.id.get(),
            f.name,
            dim(&f.media_type),
            dim(&format!("{:.1} KiB", f.size as f64 / 1024.0)),
        );
    }
}

fn print_state(session: &Session) {
    eprintln!("state:     {}", session.state());
    eprintln!(
        "length:    {} (~{} words)",
        session.length(),
        session.length().word_limit()
    );
    eprintln!("highlight: {}", if session.highlight() { "on" } else { "off" });
    if let Some(f) = session.active_file() {
        eprintln!("active:    #{} {}", f.id, f.name);
    }
    if let Some(e) = session.error() {
        eprintln!("error:     {}", red(e));
    }
}
