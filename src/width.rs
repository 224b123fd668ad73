use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unsupported register width {0}, expected one of 4, 8 or 16")]
pub struct WidthError(String);

/// Register width of a self-shrinking LFSR.
///
/// Every width stores its register in a `u16`; bits above the width are
/// always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Width {
    W4,
    W8,
    W16,
}

impl Width {
    #[cfg(test)]
    pub const ALL: [Width; 3] = [Width::W4, Width::W8, Width::W16];

    const REFERENCE_4: [u32; 4] = [1, 7, 11, 13];
    const REFERENCE_8: [u32; 21] = [
        1, 11, 29, 63, 68, 83, 104, 106, 129, 134, 150, 155, 170, 176, 177, 192, 195, 202, 225,
        237, 253,
    ];

    #[inline(always)]
    pub const fn bits(self) -> u32 {
        match self {
            Width::W4 => 4,
            Width::W8 => 8,
            Width::W16 => 16,
        }
    }

    /// Tap mask of the full-width feedback.
    #[inline(always)]
    const fn taps(self) -> u16 {
        match self {
            Width::W4 => 0b0011,
            Width::W8 => 0b0001_1101,
            Width::W16 => 0b0001_0000_0000_1011,
        }
    }

    /// Tap mask of the feedback over the lower half.
    #[inline(always)]
    const fn sub_taps(self) -> u16 {
        match self {
            Width::W4 => 0b11,
            Width::W8 => 0b0011,
            Width::W16 => 0b0001_1101,
        }
    }

    #[inline(always)]
    const fn lower_mask(self) -> u16 {
        (1 << (self.bits() / 2)) - 1
    }

    /// Number of nonzero register values, `2^w - 1`.
    #[inline(always)]
    pub const fn max_state(self) -> u32 {
        (1 << self.bits()) - 1
    }

    /// Number of table entries needed to index every register value.
    #[inline(always)]
    pub const fn table_len(self) -> usize {
        1 << self.bits()
    }

    #[inline(always)]
    pub fn shift(self, register: u16) -> u16 {
        feedback_shift(register, self.taps(), self.bits())
    }

    #[inline(always)]
    pub fn sub_shift(self, register: u16) -> u16 {
        let mask = self.lower_mask();
        let higher = register & !mask;
        let lower = feedback_shift(register & mask, self.sub_taps(), self.bits() / 2);
        higher | lower
    }

    /// `interval` shifts followed by a single sub-shift.
    pub fn composite(self, mut register: u16, interval: u32) -> u16 {
        for _ in 0..interval {
            register = self.shift(register);
        }
        self.sub_shift(register)
    }

    /// Full-period intervals over the canonical range, when they are known.
    pub fn reference_intervals(self) -> Option<&'static [u32]> {
        match self {
            Width::W4 => Some(&Self::REFERENCE_4),
            Width::W8 => Some(&Self::REFERENCE_8),
            Width::W16 => None,
        }
    }
}

#[inline(always)]
fn feedback_shift(value: u16, taps: u16, bits: u32) -> u16 {
    let bit = (value & taps).count_ones() & 1;
    (value >> 1) | ((bit as u16) << (bits - 1))
}

impl TryFrom<u32> for Width {
    type Error = WidthError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            4 => Ok(Width::W4),
            8 => Ok(Width::W8),
            16 => Ok(Width::W16),
            _ => Err(WidthError(bits.to_string())),
        }
    }
}

impl FromStr for Width {
    type Err = WidthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map_err(|_| WidthError(s.to_string()))
            .and_then(Width::try_from)
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}
