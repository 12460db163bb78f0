//! Decoding of the half-words the DMA stream writes.
//!
//! Conversions are left aligned, so the raw count sits in the top bits. In
//! DMA access mode 1 the ring alternates between ADC1 and ADC2 results of
//! the same trigger: even indices are ADC1, odd indices ADC2.

use crate::hal::Resolution;

/// Right-align a left-aligned conversion.
pub const fn raw(sample: u16, resolution: Resolution) -> u16 {
    sample >> (16 - resolution.width())
}

pub const fn to_millivolts(raw: u16, resolution: Resolution, vref_mv: u32) -> u32 {
    raw as u32 * vref_mv / ((1 << resolution.width()) - 1)
}

/// One trigger's worth of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DualSample {
    pub adc1: u16,
    pub adc2: u16,
}

impl DualSample {
    pub const fn raw(self, resolution: Resolution) -> (u16, u16) {
        (raw(self.adc1, resolution), raw(self.adc2, resolution))
    }

    /// Mean of both conversions, right aligned.
    pub const fn average(self, resolution: Resolution) -> u16 {
        let (a, b) = self.raw(resolution);
        ((a as u32 + b as u32) / 2) as u16
    }
}

/// Pair up `samples`, which must start on an ADC1 result. A trailing
/// unpaired half-word is skipped.
pub fn pairs(samples: &[u16]) -> impl Iterator<Item = DualSample> + '_ {
    samples.chunks_exact(2).map(|pair| DualSample {
        adc1: pair[0],
        adc2: pair[1],
    })
}
