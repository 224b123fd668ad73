use std::fmt;
use std::ops::Range;
use std::panic;
use std::thread;

use crossbeam::channel::{bounded, select, Receiver, Sender};
use log::{debug, info};
use thiserror::Error;

use crate::lut::{LutBuilder, WorkItem};
use crate::progress::Progress;
use crate::shutdown::CancelToken;
use crate::width::Width;
use crate::worker::Worker;

#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum ConfigError {
    #[error("start parameter must be between 1 and {max}: {start}")]
    Start { start: u32, max: u32 },
    #[error("end parameter must be between start ({start}) and {max}: {end}")]
    End { start: u32, end: u32, max: u32 },
    #[error("worker count must be at least 1")]
    NoWorkers,
}

/// A validated "test intervals `[start, end)` at width `w`" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SearchRequest {
    width: Width,
    intervals: Range<u32>,
    workers: usize,
}

impl SearchRequest {
    /// Validates the range and sizes the pool.
    ///
    /// `start == end` is widened to the single interval `start`. `workers`
    /// defaults to the available parallelism and is capped at the number of
    /// intervals so no thread sits idle.
    pub fn new(
        width: Width,
        start: Option<u32>,
        end: Option<u32>,
        workers: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let max = width.max_state();
        let start = start.unwrap_or(1);
        let mut end = end.unwrap_or(max);

        if start < 1 || start > max {
            return Err(ConfigError::Start { start, max });
        }
        if end < start || end > max {
            return Err(ConfigError::End { start, end, max });
        }
        if start == end {
            end += 1;
        }

        let workers = match workers {
            Some(0) => return Err(ConfigError::NoWorkers),
            Some(n) => n,
            None => thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1),
        };
        let workers = workers.min((end - start) as usize);

        Ok(Self {
            width,
            intervals: start..end,
            workers,
        })
    }

    pub fn width(&self) -> Width {
        self.width
    }

    /// Runs the pipeline until the range is exhausted or `cancel` fires.
    ///
    /// The calling thread builds tables; `workers` threads test them and a
    /// single aggregator thread owns the result list. The list is only read
    /// after every worker and the aggregator have been joined, whichever way
    /// the run ended.
    pub fn run(&self, cancel: &CancelToken, progress: &dyn Progress) -> SearchReport {
        info!(
            "Testing intervals [{}, {}) at width {} with {} workers",
            self.intervals.start, self.intervals.end, self.width, self.workers
        );

        let (todo_tx, todo_rx) = bounded::<WorkItem>(self.workers * 2);
        let (working_tx, working_rx) = bounded::<u32>(self.workers);

        let (emitted, tested, mut intervals) = thread::scope(|s| {
            let aggregator = s.spawn(move || aggregate(working_rx));

            let workers: Vec<_> = (0..self.workers)
                .map(|id| {
                    let todo = todo_rx.clone();
                    let working = working_tx.clone();
                    let worker = Worker::new(id, self.width, progress);
                    s.spawn(move || worker.run(todo, working, cancel))
                })
                .collect();
            drop(todo_rx);
            drop(working_tx);

            let emitted = feed(
                LutBuilder::new(self.width, self.intervals.clone()),
                todo_tx,
                cancel,
            );

            let tested: usize = workers.into_iter().map(join).sum();
            (emitted, tested, join(aggregator))
        });

        intervals.sort_unstable();
        intervals.dedup();

        let total = self.intervals.len();
        let completion = if tested == total {
            Completion::Finished
        } else {
            Completion::Partial { tested, total }
        };
        debug!("Built {} tables, tested {} of {}", emitted, tested, total);

        SearchReport {
            width: self.width,
            intervals: self.intervals.clone(),
            found: intervals,
            completion,
        }
    }
}

/// Pushes tables onto the queue in interval order until the builder runs
/// dry or the run is cancelled. Dropping `todo` closes the queue.
fn feed(mut builder: LutBuilder, todo: Sender<WorkItem>, cancel: &CancelToken) -> usize {
    let mut emitted = 0;
    while !cancel.is_cancelled() {
        let Some(item) = builder.next() else {
            break;
        };
        select! {
            send(todo, item) -> res => if res.is_err() { break },
            recv(cancel.notice()) -> _ => break,
        }
        emitted += 1;
    }
    emitted
}

fn aggregate(working: Receiver<u32>) -> Vec<u32> {
    working.iter().collect()
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| panic::resume_unwind(payload))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    Finished,
    Partial { tested: usize, total: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SearchReport {
    pub width: Width,
    pub intervals: Range<u32>,
    pub found: Vec<u32>,
    pub completion: Completion,
}

impl SearchReport {
    pub fn is_partial(&self) -> bool {
        matches!(self.completion, Completion::Partial { .. })
    }

    /// Comparison against the known full-period set, for finished
    /// full-range runs at widths where that set is known.
    pub fn matches_reference(&self) -> Option<bool> {
        if self.is_partial() || self.intervals != (1..self.width.max_state()) {
            return None;
        }
        self.width
            .reference_intervals()
            .map(|reference| reference == self.found.as_slice())
    }
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Completion::Partial { tested, total } = self.completion {
            writeln!(
                f,
                "PARTIAL RESULTS: interrupted after testing {} of {} intervals",
                tested, total
            )?;
        }
        writeln!(
            f,
            "tested intervals: [{}, {}) at width {}",
            self.intervals.start, self.intervals.end, self.width
        )?;
        let found: Vec<String> = self.found.iter().map(|i| i.to_string()).collect();
        writeln!(f, "[{}]", found.join(" "))?;
        writeln!(f, "working count: {}", self.found.len())?;
        if let Some(matches) = self.matches_reference() {
            writeln!(f, "matches expected results: {}", matches)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::progress::testing::Recorder;
    use crate::verifier::verify_interval;

    #[test]
    fn validation() {
        assert_eq!(
            SearchRequest::new(Width::W8, Some(0), None, Some(1)),
            Err(ConfigError::Start { start: 0, max: 255 })
        );
        assert_eq!(
            SearchRequest::new(Width::W4, Some(16), None, Some(1)),
            Err(ConfigError::Start { start: 16, max: 15 })
        );
        assert_eq!(
            SearchRequest::new(Width::W4, Some(5), Some(4), Some(1)),
            Err(ConfigError::End {
                start: 5,
                end: 4,
                max: 15
            })
        );
        assert_eq!(
            SearchRequest::new(Width::W4, Some(5), Some(16), Some(1)),
            Err(ConfigError::End {
                start: 5,
                end: 16,
                max: 15
            })
        );
        assert_eq!(
            SearchRequest::new(Width::W4, None, None, Some(0)),
            Err(ConfigError::NoWorkers)
        );
    }

    #[test]
    fn defaults_and_caps() {
        let request = SearchRequest::new(Width::W8, None, None, Some(1000)).unwrap();
        assert_eq!(request.intervals, 1..255);
        assert_eq!(request.workers, 254);

        let request = SearchRequest::new(Width::W8, Some(7), Some(7), Some(4)).unwrap();
        assert_eq!(request.intervals, 7..8);
        assert_eq!(request.workers, 1);

        let request = SearchRequest::new(Width::W4, Some(15), Some(15), None).unwrap();
        assert_eq!(request.intervals, 15..16);
    }

    #[test]
    fn full_range_4() {
        let request = SearchRequest::new(Width::W4, None, None, Some(3)).unwrap();
        let report = request.run(&CancelToken::new(), &Recorder::default());

        assert_eq!(report.completion, Completion::Finished);
        assert_eq!(report.found, vec![1, 7, 11, 13]);
        assert_eq!(report.matches_reference(), Some(true));
    }

    #[test]
    fn full_range_8() {
        let request = SearchRequest::new(Width::W8, None, None, None).unwrap();
        let report = request.run(&CancelToken::new(), &Recorder::default());

        assert_eq!(report.completion, Completion::Finished);
        assert_eq!(report.found, Width::W8.reference_intervals().unwrap());
        assert_eq!(report.matches_reference(), Some(true));
    }

    #[test]
    fn sub_range_has_no_reference_verdict() {
        let request = SearchRequest::new(Width::W8, Some(100), Some(200), Some(4)).unwrap();
        let report = request.run(&CancelToken::new(), &Recorder::default());

        assert_eq!(
            report.found,
            vec![104, 106, 129, 134, 150, 155, 170, 176, 177, 192, 195]
        );
        assert_eq!(report.matches_reference(), None);
    }

    #[test]
    fn cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let request = SearchRequest::new(Width::W8, None, None, Some(2)).unwrap();
        let report = request.run(&cancel, &Recorder::default());

        assert_eq!(
            report.completion,
            Completion::Partial {
                tested: 0,
                total: 254
            }
        );
        assert!(report.found.is_empty());
        assert_eq!(report.matches_reference(), None);
    }

    #[test]
    fn cancelled_late_sub_range_returns_promptly() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let request = SearchRequest::new(Width::W16, Some(60000), Some(60001), Some(1)).unwrap();
        let started = Instant::now();
        let report = request.run(&cancel, &Recorder::default());

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(
            report.completion,
            Completion::Partial {
                tested: 0,
                total: 1
            }
        );
    }

    #[test]
    fn cancel_after_finish_is_still_complete() {
        let cancel = CancelToken::new();
        let request = SearchRequest::new(Width::W4, None, None, Some(2)).unwrap();
        let report = request.run(&cancel, &Recorder::default());
        cancel.cancel();

        assert!(!report.is_partial());
    }

    #[test]
    fn cancel_mid_run_16() {
        let cancel = CancelToken::new();
        let progress = Recorder::default();
        let request = SearchRequest::new(Width::W16, None, None, None).unwrap();

        let started = Instant::now();
        let report = thread::scope(|s| {
            let run = s.spawn(|| request.run(&cancel, &progress));
            thread::sleep(Duration::from_millis(50));
            cancel.cancel();
            run.join().unwrap()
        });
        assert!(started.elapsed() < Duration::from_secs(10));

        let Completion::Partial { tested, total } = report.completion else {
            panic!("expected a partial report, got {:?}", report.completion);
        };
        assert_eq!(total, 65534);
        assert!(tested < total);
        assert!(report.is_partial());
        assert_eq!(report.matches_reference(), None);
        assert!(report.found.windows(2).all(|w| w[0] < w[1]));
        assert!(report.found.len() <= tested);
        for &interval in &report.found {
            assert!(verify_interval(Width::W16, interval), "interval {}", interval);
        }

        let rendered = report.to_string();
        assert!(rendered.starts_with("PARTIAL RESULTS"));
    }

    #[test]
    fn render_finished() {
        let report = SearchReport {
            width: Width::W4,
            intervals: 1..15,
            found: vec![1, 7, 11, 13],
            completion: Completion::Finished,
        };
        assert_eq!(
            report.to_string(),
            "tested intervals: [1, 15) at width 4\n\
             [1 7 11 13]\n\
             working count: 4\n\
             matches expected results: true\n"
        );
    }
}
