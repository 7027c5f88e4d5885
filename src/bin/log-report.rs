//! CLI tool to summarize the access logs found under a directory.
//!
//! Usage:
//!   log-report [root] [-p <glob>] [-l <bytes>] [-t <n>] [--skip-malformed] [-v]
//!
//! The report is written to stdout; diagnostics go to stderr.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use logpipe::discover::DEFAULT_PATTERN;
use logpipe::{PipelineError, Report, access_log, discover};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Summarize web-server access logs (plain, .gz and .bz2).
#[derive(Parser)]
#[command(name = "log-report")]
struct Cli {
    /// Directory to search for log files
    #[arg(default_value = "www")]
    root: PathBuf,

    /// Glob, relative to root, selecting the log files
    #[arg(short, long, default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// Byte count above which a transfer is listed as large
    #[arg(short, long, default_value_t = 1_000_000)]
    large: i64,

    /// Number of per-request download counts to show
    #[arg(short, long, default_value_t = 10)]
    top: usize,

    /// Skip records with malformed status or byte fields instead of failing
    #[arg(long)]
    skip_malformed: bool,

    /// Log each source as it is opened and drained
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<Report, PipelineError> {
    let paths = discover(&cli.root, &cli.pattern)?;
    info!(root = %cli.root.display(), files = paths.len(), "discovered log files");
    if paths.is_empty() {
        warn!(pattern = %cli.pattern, "no log files matched");
    }

    let records = if cli.skip_malformed {
        access_log(&paths)
            .skip_malformed(|err| warn!(error = %err, "skipping malformed record"))
            .materialize()?
    } else {
        access_log(&paths).materialize()?
    };
    info!(records = records.len(), "parsed log records");

    Report::build(&records, cli.large)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(report) => print!("{}", report.top(cli.top)),
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            process::exit(1);
        }
    }
}
