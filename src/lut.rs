use std::ops::Range;

use crate::width::Width;

/// One interval's combined transition table, ready for a worker.
#[derive(Debug)]
pub(crate) struct WorkItem {
    pub interval: u32,
    pub table: Box<[u16]>,
}

impl WorkItem {
    #[inline(always)]
    pub fn step(&self, register: u16) -> u16 {
        self.table[register as usize]
    }
}

/// Builds the tables of consecutive intervals incrementally.
///
/// `shuttle[v]` holds `v` shifted once per interval emitted so far, so each
/// table costs one shift and one sub-shift per entry no matter how large the
/// interval is. Tables must therefore be produced in increasing order.
#[derive(Debug)]
pub(crate) struct LutBuilder {
    width: Width,
    shuttle: Vec<u16>,
    intervals: Range<u32>,
}

impl LutBuilder {
    pub fn new(width: Width, intervals: Range<u32>) -> Self {
        let shuttle = shifted_by(width, intervals.start.saturating_sub(1));

        Self {
            width,
            shuttle,
            intervals,
        }
    }
}

/// `shift^depth(v)` for every register value, in O(2^w) for any depth.
///
/// `shift` is maximal length, so every nonzero value sits on the single
/// cycle through 1 and shifting `depth` times moves `depth` places along it.
fn shifted_by(width: Width, depth: u32) -> Vec<u16> {
    let len = width.max_state() as usize;
    let mut cycle = Vec::with_capacity(len);
    let mut position = vec![0usize; width.table_len()];

    let mut v = 1;
    for i in 0..len {
        cycle.push(v);
        position[v as usize] = i;
        v = width.shift(v);
    }

    let depth = depth as usize % len;
    let mut shuttle = vec![0; width.table_len()];
    for (v, slot) in shuttle.iter_mut().enumerate().skip(1) {
        *slot = cycle[(position[v] + depth) % len];
    }
    shuttle
}

fn advance(width: Width, shuttle: &mut [u16]) {
    for v in shuttle.iter_mut() {
        *v = width.shift(*v);
    }
}

impl Iterator for LutBuilder {
    type Item = WorkItem;

    fn next(&mut self) -> Option<Self::Item> {
        let interval = self.intervals.next()?;
        advance(self.width, &mut self.shuttle);

        let table = self
            .shuttle
            .iter()
            .map(|&v| self.width.sub_shift(v))
            .collect();

        Some(WorkItem { interval, table })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.intervals.size_hint()
    }
}

impl ExactSizeIterator for LutBuilder {}
