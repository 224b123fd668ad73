mod config;
mod lut;
mod progress;
mod search;
mod shutdown;
mod sslfsr;
mod verifier;
mod visited;
mod width;
mod worker;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam::channel::{bounded, select, tick, Receiver};
use log::{error, info, warn};

use self::config::{Cli, Command, PeriodArgs, SearchArgs, VerifyArgs};
use self::progress::LogProgress;
use self::search::{SearchReport, SearchRequest};
use self::shutdown::CancelToken;
use self::sslfsr::Sslfsr;
use self::verifier::{cross_check, parse_interval_args, verify_interval, CrossCheck};

const EXIT_SUCCESS: u8 = 0;
const EXIT_INTERRUPTED: u8 = 1;
const EXIT_INVALID: u8 = 2;
const EXIT_MISMATCH: u8 = 3;

/// Set from the SIGINT/SIGTERM handler, forwarded to the run's token.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::Relaxed);
    // Safety:
    // `signal` is async-signal-safe. The next delivery terminates the process.
    unsafe {
        libc::signal(signal, libc::SIG_DFL);
    }
}

fn install_signal_handlers() {
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // Safety:
    // The handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

/// Polls the signal flag until `done` closes.
fn watch_signals(cancel: CancelToken, done: Receiver<()>) {
    let ticker = tick(Duration::from_millis(25));
    loop {
        select! {
            recv(ticker) -> _ => {
                if INTERRUPTED.load(Ordering::Relaxed) {
                    cancel.cancel();
                    return;
                }
            }
            recv(done) -> _ => return,
        }
    }
}

fn write_report(path: &Path, report: &SearchReport) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "{}", report)?;
    out.flush()
}

/// Maps a finished search and its cross-check to the process exit status.
fn exit_status(report: &SearchReport, check: CrossCheck) -> u8 {
    if report.is_partial() || check == CrossCheck::Interrupted {
        EXIT_INTERRUPTED
    } else if report.matches_reference() == Some(false) || matches!(check, CrossCheck::Rejected(_))
    {
        EXIT_MISMATCH
    } else {
        EXIT_SUCCESS
    }
}

fn run_search(args: SearchArgs, cancel: &CancelToken) -> ExitCode {
    let request = match SearchRequest::new(args.width, args.start, args.end, args.workers) {
        Ok(request) => request,
        Err(err) => {
            error!("{}", err);
            return ExitCode::from(EXIT_INVALID);
        }
    };

    let report = request.run(cancel, &LogProgress);
    println!();
    print!("{}", report);

    if let Some(path) = &args.output {
        match write_report(path, &report) {
            Ok(()) => info!("Report written to {}", path.display()),
            Err(err) => error!("Could not write report to {}: {}", path.display(), err),
        }
    }

    // widths without a reference set are only validated by the verifier
    let wants_check = args.cross_check || request.width().reference_intervals().is_none();
    let check = if wants_check && !report.is_partial() {
        info!("Cross-checking {} intervals", report.found.len());
        cross_check(request.width(), &report.found, cancel)
    } else {
        CrossCheck::Skipped
    };
    match check {
        CrossCheck::Agreed => {
            println!("cross-check: all {} intervals verified", report.found.len())
        }
        CrossCheck::Rejected(interval) => error!("Verifier rejects interval {}", interval),
        CrossCheck::Interrupted => println!("cross-check: interrupted"),
        CrossCheck::Skipped => {}
    }

    ExitCode::from(exit_status(&report, check))
}

fn run_verify(args: VerifyArgs, cancel: &CancelToken) -> ExitCode {
    let (intervals, errors) = parse_interval_args(args.width, &args.intervals[..]);
    for err in &errors {
        error!("{}", err);
    }
    if intervals.is_empty() {
        error!("please provide intervals to verify");
        return ExitCode::from(EXIT_INVALID);
    }

    for interval in intervals {
        if cancel.is_cancelled() {
            return ExitCode::from(EXIT_INTERRUPTED);
        }
        println!("{} - {}", interval, verify_interval(args.width, interval));
    }

    ExitCode::SUCCESS
}

fn run_period(args: PeriodArgs, cancel: &CancelToken) -> ExitCode {
    let max = args.width.max_state();
    if let Some(bad) = args.intervals.iter().find(|&&i| i == 0 || i > max) {
        error!("interval must be between 1 and {}: {}", max, bad);
        return ExitCode::from(EXIT_INVALID);
    }

    for &interval in &args.intervals {
        if cancel.is_cancelled() {
            return ExitCode::from(EXIT_INTERRUPTED);
        }
        let mut generator = Sslfsr::new(args.width, interval);
        let expected = generator.expected_maximal_length();
        let period = generator.period();
        println!(
            "{} - period {} of maximal {}: {}",
            interval,
            period,
            expected,
            period == expected
        );
    }

    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    install_signal_handlers();
    let cancel = CancelToken::new();
    let (done_tx, done_rx) = bounded::<()>(0);
    let watcher = {
        let cancel = cancel.clone();
        thread::spawn(move || watch_signals(cancel, done_rx))
    };

    let start = Instant::now();
    let code = match cli.command {
        Command::Search(args) => run_search(args, &cancel),
        Command::Verify(args) => run_verify(args, &cancel),
        Command::Period(args) => run_period(args, &cancel),
    };

    drop(done_tx);
    if watcher.join().is_err() {
        warn!("Signal watcher panicked");
    }

    println!();
    println!("DONE: {:?}", start.elapsed());
    code
}
