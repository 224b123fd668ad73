//! Table-free check of a single interval, used to cross-check the search.

use std::collections::BTreeSet;

use rayon::prelude::*;
use thiserror::Error;

use crate::shutdown::CancelToken;
use crate::sslfsr::Sslfsr;
use crate::visited::Visited;
use crate::width::Width;

#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum IntervalArgError {
    #[error("invalid arg: {arg} - not a number")]
    NotANumber { arg: String },
    #[error("invalid arg: {arg} - must be between 1 and {max}")]
    OutOfRange { arg: String, max: u32 },
    #[error("invalid arg: {arg} - range must be increasing")]
    EmptyRange { arg: String },
    #[error("invalid arg: {arg} - unsupported number of dashes")]
    TooManyDashes { arg: String },
}

/// Replays the generator from the canonical start and checks that it comes
/// back to the start after visiting every nonzero state exactly once.
pub(crate) fn verify_interval(width: Width, interval: u32) -> bool {
    let mut register = Sslfsr::START;
    let mut visited = Visited::new(width.table_len());

    for _ in 0..width.max_state() {
        register = width.composite(register, interval);
        if visited.insert(register) {
            break;
        }
    }

    register == Sslfsr::START
        && !visited.contains(0)
        && visited.count() == width.max_state() as usize
}

/// Outcome of re-verifying the intervals a search reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CrossCheck {
    Skipped,
    Agreed,
    Rejected(u32),
    Interrupted,
}

/// Re-verifies `found` in parallel, stopping at the first rejection or when
/// `cancel` fires. A single interval is never interrupted midway.
pub(crate) fn cross_check(width: Width, found: &[u32], cancel: &CancelToken) -> CrossCheck {
    let rejected = found
        .par_iter()
        .copied()
        .find_any(|&interval| !cancel.is_cancelled() && !verify_interval(width, interval));

    if cancel.is_cancelled() {
        return CrossCheck::Interrupted;
    }
    match rejected {
        Some(interval) => CrossCheck::Rejected(interval),
        None => CrossCheck::Agreed,
    }
}

/// Parses `N` and inclusive `LOW-HIGH` arguments into a sorted, deduplicated
/// interval set. Invalid arguments are returned alongside instead of
/// aborting the whole batch.
pub(crate) fn parse_interval_args<S: AsRef<str>>(
    width: Width,
    args: &[S],
) -> (Vec<u32>, Vec<IntervalArgError>) {
    let mut intervals = BTreeSet::new();
    let mut errors = Vec::new();

    for arg in args {
        match parse_one(width, arg.as_ref()) {
            Ok((low, high)) => intervals.extend(low..=high),
            Err(err) => errors.push(err),
        }
    }

    (intervals.into_iter().collect(), errors)
}

fn parse_one(width: Width, arg: &str) -> Result<(u32, u32), IntervalArgError> {
    let number = |s: &str| -> Result<u32, IntervalArgError> {
        let n = s.trim().parse::<u32>().map_err(|_| IntervalArgError::NotANumber {
            arg: arg.to_string(),
        })?;
        if n == 0 || n > width.max_state() {
            return Err(IntervalArgError::OutOfRange {
                arg: arg.to_string(),
                max: width.max_state(),
            });
        }
        Ok(n)
    };

    let parts: Vec<&str> = arg.split('-').collect();
    match parts.as_slice() {
        [single] => {
            let n = number(*single)?;
            Ok((n, n))
        }
        [low, high] => {
            let (low, high) = (number(*low)?, number(*high)?);
            if low >= high {
                return Err(IntervalArgError::EmptyRange {
                    arg: arg.to_string(),
                });
            }
            Ok((low, high))
        }
        _ => Err(IntervalArgError::TooManyDashes {
            arg: arg.to_string(),
        }),
    }
}
