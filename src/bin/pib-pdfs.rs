//! CLI binary for pib-pdfs.
//!
//! A thin shim over the library crate that maps CLI flags to `JobConfig`,
//! runs one subcommand and prints a summary.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pib_pdfs::{
    download_reports_from_file, pipeline::input::load_payload, run_job, run_job_without_webhook,
    run_watch, webhook, BatchOutput, ConversionMode, IfNoFilesFound, JobConfig, ProgressCallback,
    ProgressReporter, TriggerPayload,
};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar for the batch plus a line per finished item.
/// Items may finish out of order when `--concurrency` is above 1.
struct CliProgress {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .map(|mut t| t.remove(&index))
            .ok()
            .flatten()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ProgressReporter for CliProgress {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len}  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_prefix("Fetching");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Fetching {total} items…"))
        ));
    }

    fn on_item_start(&self, index: usize, _total: usize, label: &str) {
        if let Ok(mut t) = self.start_times.lock() {
            t.insert(index, Instant::now());
        }
        self.bar.set_message(label.to_string());
    }

    fn on_item_complete(&self, index: usize, total: usize, file_name: &str, bytes: u64) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<28}  {}  {}",
            green("✓"),
            index,
            total,
            file_name,
            dim(&format!("{bytes:>9} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, index: usize, total: usize, label: &str, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index,
            total,
            label,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} items fetched successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} items fetched  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the job for a repository-dispatch event (reads $GITHUB_EVENT_PATH)
  pib-pdfs fetch

  # Run the job for an explicit payload file
  pib-pdfs fetch --payload payload.json

  # Links on the command line, no webhook
  pib-pdfs fetch --no-webhook \
      "https://pib.gov.in/PressReleasePage.aspx?PRID=2100000"

  # Download a report list into ./reports as report_1.pdf, report_2.pdf, …
  pib-pdfs -o reports download reports.json

  # Poll the publications page and fetch what is new since the last run
  pib-pdfs watch --record pdf_links.txt

  # Re-send the summary of an existing directory
  pib-pdfs -o pdfs report --webhook https://n8n.example.org/webhook/pib

PAYLOAD FORMAT:
  {"links": ["https://..."], "n8n_webhook": "https://...",
   "timestamp": "2025-06-01T10:00:00Z", "count": 1}
  A repository-dispatch envelope ({"client_payload": {...}}) is unwrapped.

ENVIRONMENT VARIABLES:
  GITHUB_EVENT_PATH       Payload file used by `fetch` when --payload is absent
  GITHUB_RUN_ID           Run id echoed in the webhook metadata
  PIB_CHROME_PATH         Browser executable used for printing pages
  BROWSER_AUTO_CACHE_DIR  Override the browser cache directory
  RUST_LOG                Log filter (overrides --verbose / --quiet)
"#;

/// Fetch press releases and reports as PDFs and report what was collected.
#[derive(Parser, Debug)]
#[command(
    name = "pib-pdfs",
    version,
    about = "Fetch press releases and reports as PDFs and report what was collected",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert the links of a trigger payload, publish the artifact, POST the summary.
    Fetch(FetchArgs),

    /// Download a JSON list of {title, pdfUrl} records as report_<n>.pdf.
    Download {
        /// Path to the JSON report list.
        reports: PathBuf,
    },

    /// Download PDFs newly linked from an index page.
    Watch(WatchArgs),

    /// POST the summary of the output directory without fetching anything.
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Links to convert. When given, --payload is ignored.
    links: Vec<String>,

    /// Trigger payload file (bare payload or repository-dispatch event).
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    payload: Option<PathBuf>,

    /// Webhook URL for links given on the command line.
    #[arg(long, env = "PIB_PDFS_WEBHOOK")]
    webhook: Option<String>,

    /// Timestamp echoed in the summary for links given on the command line.
    #[arg(long)]
    timestamp: Option<String>,

    /// Declared count echoed as processed_urls for links given on the command line.
    #[arg(long)]
    count: Option<u64>,

    /// Skip the webhook POST.
    #[arg(long, env = "PIB_PDFS_NO_WEBHOOK")]
    no_webhook: bool,
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Index page to scan for PDF links.
    #[arg(
        long,
        env = "PIB_PDFS_WATCH_URL",
        default_value = "https://mospi.gov.in/documents/213904/0/SDD_Publications.html"
    )]
    url: String,

    /// Seen-links record, one URL per line.
    #[arg(long, env = "PIB_PDFS_RECORD", default_value = "pdf_links.txt")]
    record: PathBuf,

    /// Optional webhook for a summary of newly downloaded files.
    #[arg(long, env = "PIB_PDFS_WEBHOOK")]
    webhook: Option<String>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Webhook URL to POST to.
    #[arg(long, env = "PIB_PDFS_WEBHOOK")]
    webhook: String,

    /// Timestamp echoed in the summary.
    #[arg(long)]
    timestamp: Option<String>,

    /// Value reported as processed_urls. Default: the number of PDFs found.
    #[arg(long)]
    count: Option<u64>,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Directory receiving the PDFs.
    #[arg(short, long, global = true, env = "PIB_PDFS_OUTPUT_DIR", default_value = "pdfs")]
    output_dir: PathBuf,

    /// Number of items fetched at once.
    #[arg(short, long, global = true, env = "PIB_PDFS_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// How links become PDFs: auto, render, download.
    #[arg(long, global = true, env = "PIB_PDFS_MODE", value_enum, default_value = "auto")]
    mode: ModeArg,

    /// Browser executable used for printing pages.
    #[arg(long, global = true, env = "PIB_PDFS_BROWSER")]
    browser: Option<PathBuf>,

    /// Browser viewport used when printing, as WIDTHxHEIGHT.
    #[arg(long, global = true, env = "PIB_PDFS_WINDOW_SIZE", value_parser = parse_window_size, default_value = "1280x1080")]
    window_size: (u32, u32),

    /// Per-page browser timeout in seconds.
    #[arg(long, global = true, env = "PIB_PDFS_RENDER_TIMEOUT", default_value_t = 60)]
    render_timeout: u64,

    /// HTTP download timeout in seconds (default: none).
    #[arg(long, global = true, env = "PIB_PDFS_DOWNLOAD_TIMEOUT")]
    download_timeout: Option<u64>,

    /// Webhook POST timeout in seconds (default: none).
    #[arg(long, global = true, env = "PIB_PDFS_WEBHOOK_TIMEOUT")]
    webhook_timeout: Option<u64>,

    /// Artifact bundle name.
    #[arg(long, global = true, env = "PIB_PDFS_ARTIFACT_NAME", default_value = "pib-pdfs")]
    artifact_name: String,

    /// Directory under which artifact bundles are published.
    #[arg(long, global = true, env = "PIB_PDFS_ARTIFACT_ROOT", default_value = "artifacts")]
    artifact_root: PathBuf,

    /// What to do when there is nothing to publish: warn, error, ignore.
    #[arg(long, global = true, env = "PIB_PDFS_IF_NO_FILES_FOUND", value_enum, default_value = "warn")]
    if_no_files_found: IfNoFilesArg,

    /// Run identifier echoed in the webhook metadata.
    #[arg(long, global = true, env = "GITHUB_RUN_ID")]
    run_id: Option<String>,

    /// Print the structured result as JSON on stdout.
    #[arg(long, global = true, env = "PIB_PDFS_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "PIB_PDFS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PIB_PDFS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PIB_PDFS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ModeArg {
    Auto,
    Render,
    Download,
}

impl From<ModeArg> for ConversionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Auto => ConversionMode::Auto,
            ModeArg::Render => ConversionMode::Render,
            ModeArg::Download => ConversionMode::Download,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum IfNoFilesArg {
    Warn,
    Error,
    Ignore,
}

impl From<IfNoFilesArg> for IfNoFilesFound {
    fn from(v: IfNoFilesArg) -> Self {
        match v {
            IfNoFilesArg::Warn => IfNoFilesFound::Warn,
            IfNoFilesArg::Error => IfNoFilesFound::Error,
            IfNoFilesArg::Ignore => IfNoFilesFound::Ignore,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = &cli.common;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar only makes sense on a terminal. In CI, stderr is a
    // log file and the per-item tracing lines are the record of the run.
    let show_progress =
        !common.quiet && !common.no_progress && !common.json && io::stderr().is_terminal();
    let filter = if common.verbose {
        "debug"
    } else if common.quiet || show_progress {
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgress::new() as Arc<dyn ProgressReporter>)
    } else {
        None
    };

    let config = build_config(common, progress_cb)?;

    match cli.command {
        Command::Fetch(ref args) => fetch(args, &config, common).await,
        Command::Download { ref reports } => {
            let batch = download_reports_from_file(reports, &config)
                .await
                .context("Batch download failed")?;
            if common.json {
                print_json(&batch)?;
            } else if !common.quiet && !show_progress {
                print_batch_summary(&batch);
            }
            Ok(())
        }
        Command::Watch(ref args) => {
            let output = run_watch(&args.url, &args.record, args.webhook.as_deref(), &config)
                .await
                .context("Watcher failed")?;
            if common.json {
                print_json(&output)?;
            } else if !common.quiet {
                if output.first_run {
                    eprintln!(
                        "{} First run: recorded {} links in {}",
                        cyan("◆"),
                        output.discovered,
                        args.record.display()
                    );
                } else if output.new_links.is_empty() {
                    eprintln!("{} No new PDFs ({} known)", dim("·"), output.discovered);
                } else if !show_progress {
                    print_batch_summary(&output.batch);
                }
            }
            Ok(())
        }
        Command::Report(ref args) => {
            let client = pib_pdfs::pipeline::download::build_client(&config)?;
            let files = webhook::list_pdfs(&config.output_dir).await?;
            let count = args.count.unwrap_or(files.len() as u64);
            let body = webhook::build_payload(
                config.run_id.as_deref(),
                timestamp_value(args.timestamp.as_deref()),
                count,
                files,
            );
            let report = webhook::post(&client, &args.webhook, &body, config.webhook_timeout_secs)
                .await
                .context("Webhook delivery failed")?;
            if common.json {
                print_json(&report)?;
            } else if !common.quiet {
                eprintln!(
                    "{} Reported {} PDFs → HTTP {}",
                    if report.delivered { green("✔") } else { cyan("⚠") },
                    report.successful_pdfs,
                    report.status
                );
            }
            Ok(())
        }
    }
}

async fn fetch(args: &FetchArgs, config: &JobConfig, common: &CommonArgs) -> Result<()> {
    let payload = resolve_payload(args).await?;

    let output = if args.no_webhook {
        run_job_without_webhook(&payload, config).await
    } else {
        run_job(&payload, config).await
    }
    .context("Fetch job failed")?;

    if common.json {
        return print_json(&output);
    }
    if common.quiet {
        return Ok(());
    }

    if config.progress_callback.is_none() {
        print_batch_summary(&output.batch);
    }
    match output.artifact.path {
        Some(ref path) => eprintln!(
            "   artifact {} → {}",
            bold(&output.artifact.name),
            path.display()
        ),
        None => eprintln!("{} No files; artifact not published", cyan("⚠")),
    }
    if let Some(ref hook) = output.webhook {
        eprintln!(
            "   webhook  {} PDFs reported → HTTP {}",
            hook.successful_pdfs,
            if hook.delivered {
                green(&hook.status.to_string())
            } else {
                red(&hook.status.to_string())
            }
        );
    }
    Ok(())
}

/// Links on the command line win; otherwise read the payload file.
async fn resolve_payload(args: &FetchArgs) -> Result<TriggerPayload> {
    if !args.links.is_empty() {
        let webhook = match (&args.webhook, args.no_webhook) {
            (Some(url), _) => url.clone(),
            (None, true) => String::new(),
            (None, false) => bail!("--webhook is required when links are given on the command line"),
        };
        return Ok(TriggerPayload {
            links: args.links.clone(),
            n8n_webhook: webhook,
            timestamp: timestamp_value(args.timestamp.as_deref()),
            count: args.count,
        });
    }

    let Some(ref path) = args.payload else {
        bail!("No links given: pass links, --payload <FILE>, or set GITHUB_EVENT_PATH");
    };
    load_payload(path)
        .await
        .with_context(|| format!("Failed to load payload from {}", path.display()))
}

fn parse_window_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let num = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("'{v}': {e}"));
    Ok((num(w)?, num(h)?))
}

fn timestamp_value(s: Option<&str>) -> Value {
    s.map(|t| Value::String(t.to_string())).unwrap_or(Value::Null)
}

/// Map CLI args to `JobConfig`.
fn build_config(common: &CommonArgs, progress: Option<ProgressCallback>) -> Result<JobConfig> {
    let mut builder = JobConfig::builder()
        .output_dir(&common.output_dir)
        .concurrency(common.concurrency)
        .conversion_mode(common.mode.clone().into())
        .render_timeout_secs(common.render_timeout)
        .window_size(common.window_size.0, common.window_size.1)
        .download_timeout_secs(common.download_timeout)
        .webhook_timeout_secs(common.webhook_timeout)
        .artifact_name(&common.artifact_name)
        .artifact_root(&common.artifact_root)
        .if_no_files_found(common.if_no_files_found.clone().into());

    if let Some(ref browser) = common.browser {
        builder = builder.browser_path(browser);
    }
    if let Some(ref id) = common.run_id {
        builder = builder.run_id(id);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_batch_summary(batch: &BatchOutput) {
    for line in batch_summary(batch) {
        eprintln!("{line}");
    }
}

/// Human summary of a batch; nothing at all for an empty input list.
fn batch_summary(batch: &BatchOutput) -> Vec<String> {
    if batch.items.is_empty() {
        return Vec::new();
    }
    let stats = &batch.stats;
    let mut lines = vec![format!(
        "{}  {}/{} fetched  {} bytes  {}ms",
        if stats.failed == 0 { green("✔") } else { cyan("⚠") },
        stats.succeeded,
        stats.total,
        stats.total_bytes,
        stats.duration_ms,
    )];
    for item in batch.failures() {
        if let Some(ref e) = item.error {
            lines.push(format!("  {} {}  {}", red("✗"), item.label, dim(&e.to_string())));
        }
    }
    lines
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pib_pdfs::{BatchStats, ItemError, ItemResult};

    #[test]
    fn window_size_parses() {
        assert_eq!(parse_window_size("1280x1080"), Ok((1280, 1080)));
        assert_eq!(parse_window_size("800X600"), Ok((800, 600)));
        assert!(parse_window_size("1280").is_err());
        assert!(parse_window_size("wide x 10").is_err());
    }

    #[test]
    fn empty_batch_prints_nothing() {
        assert!(batch_summary(&BatchOutput::default()).is_empty());
    }

    #[test]
    fn summary_lists_failures() {
        let batch = BatchOutput {
            items: vec![ItemResult {
                index: 1,
                label: "Quarterly GDP".into(),
                url: "https://example.org/gdp.pdf".into(),
                path: None,
                bytes: 0,
                duration_ms: 3,
                method: None,
                error: Some(ItemError::DownloadFailed {
                    index: 1,
                    url: "https://example.org/gdp.pdf".into(),
                    detail: "HTTP 404 Not Found".into(),
                }),
            }],
            stats: BatchStats {
                total: 1,
                succeeded: 0,
                failed: 1,
                total_bytes: 0,
                duration_ms: 3,
            },
        };

        let lines = batch_summary(&batch);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("0/1 fetched"));
        assert!(lines[1].contains("Quarterly GDP"));
    }
}
