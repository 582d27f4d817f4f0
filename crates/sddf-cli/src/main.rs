//! SDDF CLI - header and content tools for the test-data workbook

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use sddf::prelude::*;
use sddf::DEFAULT_WORKBOOK;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sddf")]
#[command(
    author,
    version,
    about = "Inspect, dump and repair the header row of the SDDF test-data workbook"
)]
struct Cli {
    /// Workbook file (xlsx, xlsm)
    #[arg(
        short,
        long,
        global = true,
        env = "SDDF_WORKBOOK",
        default_value = DEFAULT_WORKBOOK
    )]
    file: PathBuf,

    /// More log output on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the header row of the active sheet
    Headers {
        /// Also report whether the header matches the SDDF layout
        #[arg(long)]
        check: bool,
    },

    /// Print every row of the active sheet
    Dump {
        /// Skip the header row
        #[arg(long)]
        data_only: bool,
    },

    /// Overwrite the header row with the SDDF layout
    FixHeaders,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Headers { check } => show_headers(&cli.file, check),
        Commands::Dump { data_only } => dump(&cli.file, data_only),
        Commands::FixHeaders => fix(&cli.file),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn show_headers(path: &Path, check: bool) -> Result<()> {
    tracing::info!(path = %path.display(), "reading header row");

    let mut stdout = io::stdout().lock();
    let header = inspect_headers(path, &mut stdout, check)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;

    if let Some(header) = header {
        tracing::debug!(columns = header.len(), "header row read");
    }
    stdout.flush().context("Failed to write to stdout")?;
    Ok(())
}

fn dump(path: &Path, data_only: bool) -> Result<()> {
    tracing::info!(path = %path.display(), data_only, "dumping rows");

    let mut stdout = io::stdout().lock();
    let rows = dump_rows(path, &mut stdout, data_only)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;

    tracing::debug!(rows, "rows printed");
    stdout.flush().context("Failed to write to stdout")?;
    Ok(())
}

fn fix(path: &Path) -> Result<()> {
    tracing::info!(path = %path.display(), "restoring header row");

    let mut stdout = io::stdout().lock();
    let report = fix_headers(path, &mut stdout)
        .with_context(|| format!("Failed to update '{}'", path.display()))?;

    tracing::info!(
        sheet = %report.sheet_name,
        replaced = report.replaced,
        inserted = report.inserted,
        "header row written"
    );
    stdout.flush().context("Failed to write to stdout")?;
    Ok(())
}
