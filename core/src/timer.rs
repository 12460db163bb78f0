use fugit::HertzU32;

use crate::Error;

/// Auto-reload value of the 16-bit trigger timer.
///
/// The timer counts `0..=period` and emits TRGO on every update, so one
/// conversion pair is triggered every `period + 1` timer ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerPeriod(u16);

impl TimerPeriod {
    /// `(timer_clock / frequency) - 1`, truncated toward zero.
    pub fn for_rate(timer_clock: HertzU32, frequency: HertzU32) -> Result<Self, Error> {
        if timer_clock.to_Hz() == 0 {
            return Err(Error::ZeroTimerClock);
        }
        let hz = frequency.to_Hz();
        if hz == 0 {
            return Err(Error::ZeroFrequency);
        }

        let ticks = timer_clock.to_Hz() / hz;
        // An auto-reload of 0 keeps the counter from running at all
        if ticks < 2 {
            return Err(Error::FrequencyTooHigh(hz));
        }

        u16::try_from(ticks - 1)
            .map(Self)
            .map_err(|_| Error::FrequencyTooLow(hz))
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Sample rate the period actually produces. Truncating the period rounds
    /// this up whenever the timer clock isn't a multiple of the requested rate.
    pub fn actual_rate(self, timer_clock: HertzU32) -> HertzU32 {
        HertzU32::Hz(timer_clock.to_Hz() / (u32::from(self.0) + 1))
    }
}
