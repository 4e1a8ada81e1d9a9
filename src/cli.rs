//! CLI argument parsing for riskcall

use crate::instrument::DangerousApiPass;
use crate::runtime::DEFAULT_SUMMARY_LIMIT;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "riskcall")]
#[command(version)]
#[command(about = "Instrument and profile calls to risky APIs", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output (to stderr)
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run instrumentation passes over a JSON module
    Instrument {
        /// Module to instrument
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Write the instrumented module here instead of stdout
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Comma-separated pass pipeline
        #[arg(long = "passes", default_value = DangerousApiPass::NAME)]
        passes: String,

        /// Instrumenter configuration (riskcall.toml)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print the instrumented module as text to stderr
        #[arg(long = "print")]
        print: bool,

        /// Run only passes marked as required
        #[arg(long = "required-only")]
        required_only: bool,
    },

    /// Print the console summary of a profile report
    Summary {
        /// Report written by an instrumented program
        #[arg(value_name = "REPORT")]
        report: PathBuf,

        /// Number of entries to show
        #[arg(short = 'n', long = "limit", default_value_t = DEFAULT_SUMMARY_LIMIT)]
        limit: usize,
    },
}
