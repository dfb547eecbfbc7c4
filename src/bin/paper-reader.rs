//! CLI binary for paper-reader.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ReaderConfig`, runs the pipeline once and prints the results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper_reader::{PaperReader, ProgressCallback, ReadProgressCallback, ReaderConfig, Stage};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn shorten(s: &str, max_chars: usize) -> String {
    let one_line = s.replace('\n', " ");
    if one_line.chars().count() > max_chars {
        let cut: String = one_line.chars().take(max_chars - 1).collect();
        format!("{cut}\u{2026}")
    } else {
        one_line
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one spinner line for the running stage and a log line
/// per finished stage.
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
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ReadProgressCallback for CliProgressCallback {
    fn on_run_start(&self, url: &str) {
        self.bar
            .println(format!("{} {}", cyan("◆"), bold(&format!("Reading {url}"))));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar
            .set_prefix(format!("[{}/{}]", stage.position(), Stage::ALL.len()));
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        self.bar.println(format!(
            "  {} {:<22} {}",
            green("✓"),
            stage.to_string(),
            dim(&shorten(detail, 80))
        ));
    }

    fn on_stage_degraded(&self, stage: Stage, reason: &str) {
        self.bar.println(format!(
            "  {} {:<22} {}",
            yellow("⚠"),
            stage.to_string(),
            yellow(&shorten(reason, 80))
        ));
    }

    fn on_run_complete(&self, _summary_len: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Interactive: prompts for the link
  paper-reader

  # arXiv abstract or HTML page
  paper-reader https://arxiv.org/abs/1706.03762
  paper-reader https://arxiv.org/html/2404.12345v1

  # Reports somewhere else
  paper-reader --output-dir reports https://arxiv.org/abs/1706.03762

  # Another model on the same endpoint
  paper-reader --model qwen-max https://arxiv.org/abs/1706.03762

  # Any OpenAI-compatible server
  paper-reader --base-url http://localhost:8000/v1 --model my-model URL

  # An edgequake-llm provider instead
  paper-reader --provider openai --model gpt-4.1-mini URL

  # Machine-readable result
  paper-reader --json URL > run.json

OUTPUT FILES:
  <output-dir>/<title>.json    summary + image lists
  <output-dir>/<title>.html    reading report (PNG gallery, text excerpt)
  <work-dir>/scraped_data.json page text cache (--no-scrape-cache to skip)

ENVIRONMENT VARIABLES:
  QWEN_API_KEY            API key for the OpenAI-compatible endpoint
  QWEN_BASE_URL           Endpoint base URL (default: DashScope compatible mode)
  PAPER_READER_MODEL      Model ID (default: qwen-plus)
  EDGEQUAKE_LLM_PROVIDER  Provider name for --provider
  OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY
                          Keys read by the matching --provider
  RUST_LOG                Log filter, overrides -v / -q

  A .env file in the current directory is loaded on startup.
"#;

/// Summarise research-paper web pages with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "paper-reader",
    version,
    about = "Summarise research-paper web pages with an LLM",
    long_about = "Fetch a paper's web page (arXiv abstract or HTML view, or any article page), \
extract its text and figures, ask an LLM for a structured Chinese summary and write a JSON \
record plus an HTML reading report.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Paper URL. Prompted for on stdin when omitted.
    url: Option<String>,

    /// Directory for <title>.json and <title>.html.
    #[arg(long, env = "PAPER_READER_OUTPUT_DIR", default_value = "paper_output")]
    output_dir: PathBuf,

    /// Directory for scraped_data.json and the temporary PNG manifest.
    #[arg(long, env = "PAPER_READER_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Chat model ID (default: qwen-plus).
    #[arg(long, env = "PAPER_READER_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, ...
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[arg(long, env = "QWEN_BASE_URL")]
    base_url: Option<String>,

    /// API key of the OpenAI-compatible endpoint.
    #[arg(long, env = "QWEN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PAPER_READER_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max output tokens of the summary.
    #[arg(long, env = "PAPER_READER_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// Do not write scraped_data.json.
    #[arg(long, env = "PAPER_READER_NO_SCRAPE_CACHE")]
    no_scrape_cache: bool,

    /// Print the run result as JSON on stdout.
    #[arg(long, env = "PAPER_READER_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PAPER_READER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPER_READER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "PAPER_READER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; -v brings them back at DEBUG.
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

    // ── Input ────────────────────────────────────────────────────────────
    let url = match cli.url.clone() {
        Some(url) => url,
        None => prompt_for_url().context("Failed to read the paper link")?,
    };
    let url = url.trim();
    if url.is_empty() {
        println!("未输入有效链接");
        return Ok(());
    }

    // ── Build reader ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ReadProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let reader = PaperReader::from_config(config).context("Failed to initialise the reader")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = reader.run(url).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise result")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        eprintln!(
            "{} {}  {}ms",
            green("✔"),
            bold(&outcome.record.paper_title),
            outcome.duration_ms
        );
        print_path("论文总结已保存到", outcome.json_path.as_deref());
        print_path("HTML报告已保存到", outcome.html_path.as_deref());
    }

    let rule = "=".repeat(50);
    println!("\n{rule}\n论文总结：\n{rule}");
    println!("{}", outcome.summary());

    Ok(())
}

fn print_path(label: &str, path: Option<&std::path::Path>) {
    match path {
        Some(p) => {
            let shown = std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
            eprintln!("   {label}：{}", shown.display());
        }
        None => eprintln!("   {label}：{}", yellow("(not written)")),
    }
}

/// Ask for the link on stdin.
fn prompt_for_url() -> Result<String> {
    print!("请输入论文链接：");
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

/// Map CLI args to `ReaderConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReaderConfig> {
    let mut builder = ReaderConfig::builder()
        .output_dir(&cli.output_dir)
        .work_dir(&cli.work_dir)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .write_scrape_cache(!cli.no_scrape_cache);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref base_url) = cli.base_url {
        builder = builder.base_url(base_url);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
