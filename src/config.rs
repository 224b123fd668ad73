use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::width::Width;

/// Search self-shrinking LFSR intervals for maximal-length cycles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Test a range of intervals in parallel
    Search(SearchArgs),
    /// Re-check single intervals without lookup tables
    Verify(VerifyArgs),
    /// Measure the generator period of single intervals
    Period(PeriodArgs),
}

#[derive(clap::Args, Debug)]
pub(crate) struct SearchArgs {
    /// Register width: 4, 8 or 16
    #[arg(short, long)]
    pub width: Width,

    /// First interval to test [default: 1]
    #[arg(short, long)]
    pub start: Option<u32>,

    /// End of the tested range, exclusive [default: 2^width - 1]
    #[arg(short, long)]
    pub end: Option<u32>,

    /// Worker threads [default: available parallelism]
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Also write the report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Re-check every reported interval with the verifier
    #[arg(long)]
    pub cross_check: bool,
}

#[derive(clap::Args, Debug)]
pub(crate) struct VerifyArgs {
    /// Register width: 4, 8 or 16
    #[arg(short, long)]
    pub width: Width,

    /// Intervals to verify, `N` or inclusive `LOW-HIGH`
    #[arg(required = true)]
    pub intervals: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub(crate) struct PeriodArgs {
    /// Register width: 4, 8 or 16
    #[arg(short, long)]
    pub width: Width,

    /// Intervals to measure
    #[arg(required = true)]
    pub intervals: Vec<u32>,
}
