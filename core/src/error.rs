use core::fmt;

use crate::{pin_map::PinId, resources::Resource};

/// Everything that can keep a sampler from being built or started.
///
/// All checks run before the first register is touched, so an error never
/// leaves the hardware half configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The pin has no channel on ADC1/ADC2.
    InvalidPin(PinId),
    EmptyBuffer,
    /// The buffer is longer than the 16-bit DMA transfer counter can address.
    BufferTooLarge(usize),
    ZeroFrequency,
    /// The configured timer clock is 0 Hz.
    ZeroTimerClock,
    /// The timer period would drop below one tick.
    FrequencyTooHigh(u32),
    /// The timer period does not fit the 16-bit counter.
    FrequencyTooLow(u32),
    /// Outside the priority levels the NVIC implements.
    InvalidIrqPriority(u8),
    AlreadySampling,
    /// Another sampler holds the resource.
    ResourceBusy(Resource),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPin(pin) => write!(f, "pin {pin} has no ADC1/ADC2 channel"),
            Error::EmptyBuffer => f.write_str("destination buffer is empty"),
            Error::BufferTooLarge(len) => {
                write!(f, "destination buffer of {len} samples exceeds the DMA counter")
            }
            Error::ZeroFrequency => f.write_str("sample frequency must be above 0 Hz"),
            Error::ZeroTimerClock => f.write_str("timer clock must be above 0 Hz"),
            Error::FrequencyTooHigh(hz) => {
                write!(f, "{hz} Hz is faster than the trigger timer can count")
            }
            Error::FrequencyTooLow(hz) => {
                write!(f, "{hz} Hz overflows the 16-bit trigger timer period")
            }
            Error::InvalidIrqPriority(priority) => {
                write!(f, "interrupt priority {priority} is out of range")
            }
            Error::AlreadySampling => f.write_str("sampler is already running"),
            Error::ResourceBusy(resource) => write!(f, "{resource} is held by another sampler"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
