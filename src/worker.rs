use crossbeam::channel::{select, Receiver, Sender};

use crate::lut::WorkItem;
use crate::progress::Progress;
use crate::shutdown::CancelToken;
use crate::sslfsr::Sslfsr;
use crate::visited::Visited;
use crate::width::Width;

/// Cycle detector owned by a single pool thread.
pub(crate) struct Worker<'a> {
    id: usize,
    width: Width,
    visited: Visited,
    progress: &'a dyn Progress,
}

impl<'a> Worker<'a> {
    pub fn new(id: usize, width: Width, progress: &'a dyn Progress) -> Self {
        Self {
            id,
            width,
            visited: Visited::new(width.table_len()),
            progress,
        }
    }

    /// Whether the table walks every nonzero state before repeating.
    ///
    /// The table is a permutation fixing 0, so the first repeat from the
    /// start is the start itself; no repeat within `2^w - 1` steps means the
    /// cycle through 1 covers the whole nonzero space.
    pub fn is_full_period(&mut self, item: &WorkItem) -> bool {
        self.visited.clear();

        let mut register = Sslfsr::START;
        for _ in 0..self.width.max_state() {
            register = item.step(register);
            if self.visited.insert(register) {
                return false;
            }
        }
        true
    }

    /// Tests items until the queue closes or the run is cancelled.
    ///
    /// Returns how many items were tested to completion. Results already
    /// confirmed are always delivered; the aggregator keeps receiving until
    /// every worker has returned.
    pub fn run(
        mut self,
        todo: Receiver<WorkItem>,
        working: Sender<u32>,
        cancel: &CancelToken,
    ) -> usize {
        let mut tested = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let item = select! {
                recv(todo) -> msg => match msg {
                    Ok(item) => item,
                    Err(_) => break,
                },
                recv(cancel.notice()) -> _ => break,
            };

            self.progress
                .report(self.id, &format!("{} - Testing...", item.interval));

            let full_period = self.is_full_period(&item);
            tested += 1;

            if full_period {
                self.progress
                    .report(self.id, &format!("{} - Full period", item.interval));
                if working.send(item.interval).is_err() {
                    break;
                }
            }
        }

        self.progress.report(self.id, &format!("DONE ({} tested)", tested));
        tested
    }
}

#[cfg(test)]
mod tests {
    use crossbeam::channel::bounded;

    use super::*;
    use crate::lut::LutBuilder;
    use crate::progress::testing::Recorder;

    #[test]
    fn full_period_intervals_4() {
        let progress = Recorder::default();
        let mut worker = Worker::new(0, Width::W4, &progress);

        let found: Vec<u32> = LutBuilder::new(Width::W4, 1..15)
            .filter(|item| worker.is_full_period(item))
            .map(|item| item.interval)
            .collect();
        assert_eq!(found, vec![1, 7, 11, 13]);
    }

    #[test]
    fn run_drains_queue_and_reports() {
        let progress = Recorder::default();
        let cancel = CancelToken::new();
        let (todo_tx, todo_rx) = bounded(4);
        let (working_tx, working_rx) = bounded(16);

        for item in LutBuilder::new(Width::W4, 1..5) {
            todo_tx.send(item).unwrap();
        }
        drop(todo_tx);

        let tested = Worker::new(3, Width::W4, &progress).run(todo_rx, working_tx, &cancel);
        assert_eq!(tested, 4);
        assert_eq!(working_rx.iter().collect::<Vec<_>>(), vec![1]);

        let lines = progress.lines.lock();
        assert!(lines.iter().all(|(id, _)| *id == 3));
        assert_eq!(lines.last().unwrap().1, "DONE (4 tested)");
    }

    #[test]
    fn cancelled_worker_takes_nothing() {
        let progress = Recorder::default();
        let cancel = CancelToken::new();
        let (todo_tx, todo_rx) = bounded(2);
        let (working_tx, working_rx) = bounded(2);

        for item in LutBuilder::new(Width::W4, 1..3) {
            todo_tx.send(item).unwrap();
        }
        cancel.cancel();

        let tested = Worker::new(0, Width::W4, &progress).run(todo_rx, working_tx, &cancel);
        assert_eq!(tested, 0);
        assert!(working_rx.try_recv().is_err());
        assert_eq!(todo_tx.len(), 2);
    }
}
