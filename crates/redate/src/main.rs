//! redate CLI - name exported photos and videos after their capture date.
//!
//! redate copies a media tree (typically a Google Takeout export) into a new
//! destination. Files with a known capture date land in `success/` as
//! `YYYY-MM-DD_HH-MM-SS_<name>`; everything else is copied untouched to
//! `fail/`. Every media file gets an entry in `log.json`.
//!
//! # Usage
//!
//! ```bash
//! # Export into ./Takeout_Export
//! redate ./Takeout
//!
//! # Explicit destination, re-encoding videos QuickTime cannot play
//! redate ./Takeout ./Sorted --reencode
//!
//! # View configuration
//! redate config show
//! ```

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use redate_core::config::IncompatiblePolicy;
use redate_core::Config;

mod cli;
mod logging;

/// redate - date-name and normalize exported photo and video libraries.
#[derive(Parser, Debug)]
#[command(name = "redate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true, env = "REDATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    export: cli::export::ExportArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

/// Load the config named on the command line, or the default one.
///
/// An explicit file must load; a broken default file only warns.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return Ok(Config::load_from(path)?);
    }
    // Logging isn't initialized yet
    Ok(Config::load().unwrap_or_else(|e| {
        eprintln!(
            "Warning: Failed to load config: {e}\n  \
             Using default configuration. Check your config file with `redate config path`."
        );
        Config::default()
    }))
}

fn apply_overrides(config: &mut Config, workers: Option<NonZeroUsize>, reencode: bool) {
    if let Some(workers) = workers {
        config.pipeline.analysis_workers = workers.get();
        config.pipeline.conversion_workers = workers.get();
    }
    if reencode {
        config.video.incompatible = IncompatiblePolicy::Reencode;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;
    apply_overrides(&mut config, cli.export.workers, cli.export.reencode);
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("redate v{}", redate_core::VERSION);

    match cli.command {
        Some(Commands::Config(args)) => cli::config::execute(args, config, cli.config).await,
        None if cli.export.src.is_none() => {
            Cli::command().print_help()?;
            Ok(())
        }
        None => cli::export::execute(cli.export, config, cli.json_logs).await,
    }
}
