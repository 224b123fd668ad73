use crate::width::Width;

/// Self-shrinking LFSR: `interval` shifts, then one sub-shift, repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sslfsr {
    width: Width,
    register: u16,
    interval: u32,
    counter: u32,
}

impl Sslfsr {
    pub const START: u16 = 1;

    pub fn new(width: Width, interval: u32) -> Self {
        Self {
            width,
            register: Self::START,
            interval,
            counter: 0,
        }
    }

    #[cfg(test)]
    pub fn register(&self) -> u16 {
        self.register
    }

    pub fn next(&mut self) {
        if self.counter == self.interval {
            self.register = self.width.sub_shift(self.register);
            self.counter = 0;
        } else {
            self.register = self.width.shift(self.register);
            self.counter += 1;
        }
    }

    /// State changes a full-period generator makes before repeating.
    pub fn expected_maximal_length(&self) -> u64 {
        self.width.max_state() as u64 * (self.interval as u64 + 1)
    }

    /// Steps until register and counter are both back where they started.
    ///
    /// Always terminates: `shift` and `sub_shift` are bijections, so the
    /// stepping function is a permutation of a finite state space.
    pub fn period(&mut self) -> u64 {
        let (register, counter) = (self.register, self.counter);

        self.next();
        let mut count = 1;
        while self.register != register || self.counter != counter {
            self.next();
            count += 1;
        }
        count
    }
}
