/// Fixed-size bitset indexed by register value.
#[derive(Debug, Clone)]
pub(crate) struct Visited {
    words: Vec<u64>,
}

impl Visited {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    /// Marks `index`, returning whether it was already marked.
    #[inline(always)]
    pub fn insert(&mut self, index: u16) -> bool {
        let (word, bit) = (index as usize / 64, index % 64);
        let mask = 1u64 << bit;
        let seen = self.words[word] & mask != 0;
        self.words[word] |= mask;
        seen
    }

    #[inline(always)]
    pub fn contains(&self, index: u16) -> bool {
        self.words[index as usize / 64] & (1u64 << (index % 64)) != 0
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
