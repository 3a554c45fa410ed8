//! CLI binary for stockfill.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `FillConfig` and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use stockfill::{
    fill, list_placements, mapping, FillConfig, FillProgressCallback, FillReport, ProgressCallback,
};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar with one log line per placement. Placements may start
/// out of order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading placement mapping…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, key: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(key))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl FillProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_placements: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} placements  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_placements as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Filling");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Filling {total_placements} placements…"))
        ));
    }

    fn on_placement_start(&self, key: &str, _index: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(key.to_string(), Instant::now());
        }
        self.bar.set_message(key.to_string());
    }

    fn on_placement_complete(&self, key: &str, index: usize, total: usize, web_path: &str) {
        let secs = self.elapsed_secs(key);
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {:<12}  {}  {}",
            green("✓"),
            index,
            total,
            key,
            dim(web_path),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_placement_error(&self, key: &str, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(key);
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {:<12}  {}  {}",
            red("✗"),
            index,
            total,
            key,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_run_complete(&self, _total_placements: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Fill public/index.html in place using scripts/image-mapping.json
  UNSPLASH_ACCESS_KEY=... stockfill

  # Write to a separate file and keep the original
  stockfill --in public/index.html --out public/index.filled.html

  # Serve images from a different URL prefix
  stockfill --public-prefix /site/public

  # Show the placements (scaffolds the mapping if missing; no key needed)
  stockfill --list-placements

  # Machine-readable run report
  stockfill --json > fill-report.json

MAPPING FORMAT (scripts/image-mapping.json):
  {
    "hero":    { "query": "modern minimal workspace desk", "w": 1920, "h": 1080, "target": "bg" },
    "profile": { "query": "portrait professional", "alt": "Our founder", "w": 800, "ar": "1:1", "target": "img" }
  }

  w defaults to 1920. h wins over ar. Without either, the photo keeps its
  own aspect ratio. target is "img" or "bg" (default "bg").

MARKING UP A SLOT:
  <section id="hero"></section>                       found by id on first run
  <img data-image-key="profile">                      bound explicitly
  <div data-image-key="pricing" data-image-target="bg"></div>

ENVIRONMENT VARIABLES:
  UNSPLASH_ACCESS_KEY   Provider access key (required to fill)
  PUBLIC_PREFIX         URL prefix for written image paths (default /mypage/public)
  RUST_LOG              Override the log filter (e.g. stockfill=debug)
"#;

/// Fill placeholder image slots in static HTML with stock photos.
#[derive(Parser, Debug)]
#[command(
    name = "stockfill",
    version,
    about = "Fill placeholder image slots in static HTML with stock photos",
    long_about = "Search a stock photo provider for each placement in an image mapping, \
download a cropped WebP rendition, patch the matching <img> or background holder in \
the HTML document in place, and record photographer credits in an attribution ledger.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// HTML document to read.
    #[arg(long = "in", value_name = "PATH", default_value = "public/index.html")]
    input: PathBuf,

    /// Where to write the patched document. Default: overwrite --in.
    #[arg(long = "out", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Placement mapping; a template is written here if it does not exist.
    #[arg(long, env = "STOCKFILL_MAPPING", default_value = "scripts/image-mapping.json")]
    mapping: PathBuf,

    /// URL prefix for image paths written into the document.
    #[arg(
        long,
        alias = "publicPrefix",
        env = "PUBLIC_PREFIX",
        default_value = "/mypage/public"
    )]
    public_prefix: String,

    /// Directory renditions are saved to.
    #[arg(long, env = "STOCKFILL_IMAGES_DIR", default_value = "public/images")]
    images_dir: PathBuf,

    /// Attribution ledger to merge entries into.
    #[arg(long, env = "STOCKFILL_LEDGER", default_value = "attribution.json")]
    ledger: PathBuf,

    /// Image provider access key.
    #[arg(long, env = "UNSPLASH_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Provider API root (for proxies and testing).
    #[arg(long, env = "STOCKFILL_API_BASE", hide = true)]
    api_base: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "STOCKFILL_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Placements whose downloads may overlap. Patching stays in mapping order.
    #[arg(short, long, env = "STOCKFILL_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Print the placements and exit (no network, no key needed).
    #[arg(long)]
    list_placements: bool,

    /// Print the run report (or placement list) as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "STOCKFILL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; warnings still get through.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_placements;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
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
        Some(CliProgressCallback::new() as Arc<dyn FillProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list_placements {
        let placements = list_placements(&config)
            .await
            .context("Failed to load placement mapping")?;
        if cli.json {
            println!("{}", mapping::to_json(&placements)?);
        } else {
            println!("{:<14} {:<4} {:<12} QUERY", "KEY", "KIND", "SIZE");
            for p in &placements {
                let dims = p.dimensions();
                let size = match dims.height {
                    Some(h) => format!("{}x{}", dims.width, h),
                    None => format!("{}w", dims.width),
                };
                println!("{:<14} {:<4} {:<12} {}", p.key, p.target, size, p.query);
            }
        }
        return Ok(());
    }

    // ── Run fill ─────────────────────────────────────────────────────────
    let report = fill(&config).await.context("Fill failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }

    Ok(())
}

/// Map CLI args to `FillConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<FillConfig> {
    let mut builder = FillConfig::builder()
        .input_path(&cli.input)
        .mapping_path(&cli.mapping)
        .public_prefix(&cli.public_prefix)
        .images_dir(&cli.images_dir)
        .ledger_path(&cli.ledger)
        .request_timeout_secs(cli.timeout)
        .concurrency(cli.concurrency);

    if let Some(ref out) = cli.output {
        builder = builder.output_path(out);
    }
    if let Some(ref key) = cli.access_key {
        builder = builder.access_key(key);
    }
    if let Some(ref base) = cli.api_base {
        builder = builder.api_base(base);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &FillReport) {
    for p in report.unmatched() {
        if let Some(msg) = p.patch.miss_message(&p.key) {
            eprintln!("{} {}: {}", yellow("⚠"), bold(&p.key), msg);
        }
    }
    eprintln!(
        "{}  {} placements  {}ms  →  {}",
        green("✔"),
        report.placements.len(),
        report.total_duration_ms,
        bold(&report.output_path.display().to_string()),
    );
    eprintln!(
        "   {} ledger entries in {}",
        dim(&report.ledger_entries.to_string()),
        dim(&report.ledger_path.display().to_string()),
    );
}
