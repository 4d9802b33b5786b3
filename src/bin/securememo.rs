//! CLI binary for securememo.
//!
//! A thin shim over the library crate: `serve` runs the HTTP front end,
//! `generate` runs one pipeline from an intake JSON file.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use securememo::{
    AppState, IntakeRecord, MemoPipeline, PipelineObserver, PipelineState, Redactor,
    ServiceConfig, StaticTokens, TaskStatus,
};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress using indicatif ─────────────────────────────────────────────

/// Prefix and message shown while the run is in `state`.
fn stage_label(state: PipelineState) -> Option<(&'static str, &'static str)> {
    match state {
        PipelineState::Generating => Some(("Generate", "Rendering template to PDF…")),
        PipelineState::Uploading => Some(("Upload", "Sending PDF to the processing service…")),
        PipelineState::RequestingProtection => Some(("Protect", "Requesting password protection…")),
        PipelineState::Polling => Some(("Wait", "Waiting for the protection task…")),
        PipelineState::Downloading => Some(("Download", "Fetching protected PDF…")),
        PipelineState::Idle | PipelineState::Done | PipelineState::Failed => None,
    }
}

/// Spinner that follows the run: one line per finished stage above it,
/// the current stage and latest status check on it.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Arc<Self> {
        bar.set_prefix("Prepare");
        bar.set_message("Loading template…");
        Arc::new(Self { bar })
    }
}

impl PipelineObserver for CliObserver {
    fn on_transition(&self, from: PipelineState, to: PipelineState) {
        if to != PipelineState::Failed {
            if let Some((prefix, _)) = stage_label(from) {
                self.bar.println(format!("{} {}", green("✔"), dim(prefix)));
            }
        }
        match stage_label(to) {
            Some((prefix, message)) => {
                self.bar.set_prefix(prefix);
                self.bar.set_message(message);
            }
            None if to != PipelineState::Idle => self.bar.finish_and_clear(),
            None => {}
        }
    }

    fn on_poll(&self, attempt: u32, max_attempts: u32, status: TaskStatus) {
        self.bar.set_message(format!("check {attempt}/{max_attempts}: {status:?}"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the HTTP API on the default address
  securememo serve

  # Serve on all interfaces, require bearer tokens
  MEMO_API_TOKENS=tok-a,tok-b securememo serve --bind 0.0.0.0:8080

  # Produce one memo from a JSON intake file
  securememo generate intake.json -o Acme_Secure_Memo.pdf

ENVIRONMENT VARIABLES:
  FOXIT_DOCGEN_CLIENT_ID       Generation surface client id (required)
  FOXIT_DOCGEN_CLIENT_SECRET   Generation surface client secret (required)
  FOXIT_PDF_CLIENT_ID          Processing surface client id (required)
  FOXIT_PDF_CLIENT_SECRET      Processing surface client secret (required)
  FOXIT_DOCGEN_BASE_URL        Generation base URL (default https://na1.fusion.foxit.com)
  FOXIT_PDF_BASE_URL           Processing base URL (default https://na1.fusion.foxit.com)
  MEMO_TEMPLATE_PATH           DOCX template (default public/template.docx)
  MEMO_POLL_INTERVAL_MS        Delay between status checks (default 1500)
  MEMO_POLL_MAX_ATTEMPTS       Status-check cap (default 15)
  MEMO_HTTP_TIMEOUT_SECS       Per-request timeout (default 60)
  MEMO_OWNER_PASSWORD          Owner password (default: random per document)
  RUST_LOG                     Log filter, overrides -v / -q
"#;

/// Turn intake records into password-protected PDF memos.
#[derive(Parser, Debug)]
#[command(
    name = "securememo",
    version,
    about = "Turn intake records into password-protected PDF memos",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Debug-level logging.
    #[arg(short, long, global = true, env = "MEMO_VERBOSE")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, global = true, env = "MEMO_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Produce a single memo and write it to disk.
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "MEMO_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Comma-separated bearer tokens; when set, every request must carry one.
    #[arg(long, env = "MEMO_API_TOKENS", hide_env_values = true)]
    api_tokens: Option<String>,

    /// Upper bound on one pipeline run, in seconds.
    #[arg(long, env = "MEMO_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Intake record as a JSON object file.
    intake: PathBuf,

    /// Output path (default: `<startupName>_Secure_Memo.pdf` in the current directory).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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

    let config = ServiceConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Command::Serve(args) => serve(config, args).await,
        Command::Generate(args) => generate(config, args, cli.quiet).await,
    }
}

async fn serve(config: ServiceConfig, args: ServeArgs) -> Result<()> {
    let pipeline = MemoPipeline::new(&config).context("Failed to build pipeline")?;

    let mut secrets = config.secrets();
    let tokens = args
        .api_tokens
        .as_deref()
        .map(StaticTokens::from_list)
        .filter(|t| !t.is_empty());
    if let Some(ref tokens) = tokens {
        secrets.extend(tokens.secrets());
    }

    let mut state = AppState::new(Arc::new(pipeline), Redactor::new(secrets));
    if let Some(tokens) = tokens {
        state = state.with_identity(Arc::new(tokens));
    }
    if let Some(secs) = args.request_timeout_secs {
        if secs == 0 {
            bail!("--request-timeout-secs must be at least 1");
        }
        state = state.with_request_timeout(Duration::from_secs(secs));
    }

    securememo::serve(args.bind, Arc::new(state))
        .await
        .with_context(|| format!("Server on {} failed", args.bind))
}

async fn generate(config: ServiceConfig, args: GenerateArgs, quiet: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.intake)
        .await
        .with_context(|| format!("Failed to read intake from {:?}", args.intake))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("{:?} is not valid JSON", args.intake))?;
    let intake = IntakeRecord::from_value(value)?;

    let progress = (!quiet).then(CliObserver::new);
    let mut builder = MemoPipeline::builder(&config);
    if let Some(ref observer) = progress {
        builder = builder.observer(observer.clone());
    }
    let pipeline = builder.build().context("Failed to build pipeline")?;

    let started = Instant::now();
    let result = pipeline.run(&intake).await;
    if let Some(ref observer) = progress {
        observer.bar.finish_and_clear();
    }
    let memo = result.context("Memo generation failed")?;

    let path = args.output.unwrap_or_else(|| PathBuf::from(&memo.filename));
    write_atomic(&path, &memo.bytes).await?;

    if !quiet {
        eprintln!(
            "{}  {} bytes  {}ms  →  {}",
            green("✔"),
            memo.bytes.len(),
            started.elapsed().as_millis(),
            bold(&path.display().to_string()),
        );
    }
    Ok(())
}

/// Write to a sibling temp file, then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp_path))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to move {:?} into place", tmp_path))?;
    Ok(())
}
