use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use sdprobe::config::{BackendKind, DEFAULT_CONFIG_FILE, ProbeConfig};
use sdprobe::report::{OutputFormat, Report};
use sdprobe::telemetry::{self, LogFormat};
use sdprobe_core::{Backends, Cleanup, ExecutionContext, Progress, RunState, TestSlot};
use sdprobe_storage::{BlockStorage, FsStorage, MemStorage};

/// SD card write/read-back integrity and throughput probe
///
/// Writes a pseudorandom pattern to a single file on the card, reads it
/// back, verifies every word, and reports per-chunk timing and throughput.
///
/// QUICK START:
///
///   sdprobe run --dir /media/sdcard
///
///   # Self-test without touching a card
///   sdprobe run --backend memory
///
///   # Show the settings a run would use
///   sdprobe config
///
/// Logging goes to stderr and is controlled by SDPROBE_LOG (default: warn).
#[derive(Parser)]
#[command(name = "sdprobe")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'sdprobe <command> --help' for more information on a specific command.")]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write, read back and verify a test file
    ///
    /// Exits 0 when every byte verified, 1 otherwise. Ctrl-C stops the run
    /// at the next chunk boundary and reports it as aborted.
    Run(RunArgs),

    /// Print the effective configuration as TOML
    Config {
        /// Config file (default: ./sdprobe.toml)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
struct RunArgs {
    /// Config file (default: ./sdprobe.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory on the card to write the test file into
    #[arg(long, value_name = "PATH")]
    dir: Option<PathBuf>,

    /// Storage backend
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Bytes per transfer
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Bytes written, then read, per direction
    #[arg(long, value_name = "BYTES")]
    total_bytes: Option<u64>,

    /// Pattern seed (non-zero)
    #[arg(long, conflicts_with = "random_seed")]
    seed: Option<u32>,

    /// Pick a fresh random seed so stale data cannot pass verification
    #[arg(long)]
    random_seed: bool,

    /// Keep the test file after the run
    #[arg(long)]
    keep: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn apply(&self, cfg: &mut ProbeConfig) {
        if let Some(dir) = &self.dir {
            cfg.storage.path.clone_from(dir);
        }
        if let Some(backend) = self.backend {
            cfg.storage.backend = backend;
        }
        if let Some(chunk_size) = self.chunk_size {
            cfg.test.chunk_size = chunk_size;
        }
        if let Some(total_bytes) = self.total_bytes {
            cfg.test.total_bytes = total_bytes;
        }
        if let Some(seed) = self.seed {
            cfg.test.seed = seed;
        }
        if self.random_seed {
            cfg.test.seed = rand::random_range(1..=u32::MAX);
        }
        if self.keep {
            cfg.test.cleanup = Cleanup::Never;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    });

    let outcome = match cli.command {
        Commands::Run(args) => run(&args),
        Commands::Config { config } => show_config(config.as_deref()),
    };
    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ProbeConfig> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    Ok(ProbeConfig::load(path)?)
}

fn show_config(path: Option<&Path>) -> Result<ExitCode> {
    let cfg = load_config(path)?;
    print!("{}", cfg.to_toml()?);
    Ok(ExitCode::SUCCESS)
}

fn open_storage(cfg: &ProbeConfig) -> Result<Box<dyn BlockStorage>> {
    Ok(match cfg.storage.backend {
        BackendKind::Fs => {
            let root = &cfg.storage.path;
            if !root.is_dir() {
                anyhow::bail!("{} is not a directory (is the card mounted?)", root.display());
            }
            Box::new(FsStorage::new(root))
        }
        BackendKind::Memory => Box::new(MemStorage::new()),
    })
}

fn run(args: &RunArgs) -> Result<ExitCode> {
    let mut cfg = load_config(args.config.as_deref())?;
    args.apply(&mut cfg);

    let plan = cfg.test.plan();
    let seed = plan.seed;
    let both_phases = plan.total_bytes.saturating_mul(2);
    let storage = open_storage(&cfg)?;
    tracing::info!(
        storage = %storage.describe(),
        chunk_size = plan.chunk_size,
        total_bytes = plan.total_bytes,
        seed,
        cleanup = %plan.cleanup,
        "starting run"
    );

    let slot = TestSlot::new();
    let ctx = ExecutionContext::start(&slot, plan, Backends::new(storage))
        .context("could not start the test")?;

    let token = ctx.cancel_token();
    ctrlc::set_handler(move || token.cancel()).context("could not install Ctrl-C handler")?;

    let bar = progress_bar(both_phases, args.json);
    let mut last = Progress::default();
    let result = ctx.wait_with_progress(cfg.test.poll_interval(), |p| {
        bar.set_message(phase_label(p.state));
        bar.set_position(p.bytes_done());
        last = *p;
    });
    bar.finish_and_clear();

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let report = Report::new(result, seed, last.stats);
    let rendered = report.render(format).context("could not render the report")?;
    print!("{rendered}");
    if format == OutputFormat::Json {
        println!();
    }

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Progress line on stderr. Hidden for `--json`; indicatif also hides it
/// when stderr is not a terminal.
fn progress_bar(len: u64, json: bool) -> ProgressBar {
    if json {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template(
        "{spinner} {msg:<8} [{bar:30}] {percent:>3}% {binary_bytes_per_sec}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    ProgressBar::new(len).with_style(style)
}

const fn phase_label(state: RunState) -> &'static str {
    match state {
        RunState::Writing => "writing",
        RunState::ReadPending | RunState::Reading => "reading",
        RunState::Idle => "starting",
        RunState::Done(_) => "done",
    }
}
