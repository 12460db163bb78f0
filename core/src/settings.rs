use fugit::HertzU32;
use serde::{Deserialize, Serialize};

use crate::hal::{AdcPrescaler, DmaPriority, FifoThreshold, SampleTime, SamplingDelay};

/// Fixed hardware parameters of a sampler.
///
/// The defaults reproduce the Particle Photon setup: a 60 MHz timer clock
/// (HCLK / 2) with the ADCs on PCLK2 / 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct Settings {
    pub timer_clock_hz: u32,
    pub adc_prescaler: AdcPrescaler,
    pub sampling_delay: SamplingDelay,
    pub sample_time: SampleTime,
    pub dma_priority: DmaPriority,
    pub fifo_threshold: FifoThreshold,
    pub irq_priority: u8,
}

impl Settings {
    pub const fn new() -> Self {
        Self {
            timer_clock_hz: 60_000_000,
            adc_prescaler: AdcPrescaler::Div2,
            sampling_delay: SamplingDelay::Cycles5,
            sample_time: SampleTime::Cycles15,
            dma_priority: DmaPriority::High,
            fifo_threshold: FifoThreshold::HalfFull,
            irq_priority: 0,
        }
    }

    pub const fn timer_clock(&self) -> HertzU32 {
        HertzU32::Hz(self.timer_clock_hz)
    }

    pub const fn with_timer_clock(mut self, clock: HertzU32) -> Self {
        self.timer_clock_hz = clock.to_Hz();
        self
    }

    pub const fn with_adc_prescaler(mut self, prescaler: AdcPrescaler) -> Self {
        self.adc_prescaler = prescaler;
        self
    }

    pub const fn with_sample_time(mut self, sample_time: SampleTime) -> Self {
        self.sample_time = sample_time;
        self
    }

    pub const fn with_sampling_delay(mut self, delay: SamplingDelay) -> Self {
        self.sampling_delay = delay;
        self
    }

    pub const fn with_dma_priority(mut self, priority: DmaPriority) -> Self {
        self.dma_priority = priority;
        self
    }

    pub const fn with_fifo_threshold(mut self, threshold: FifoThreshold) -> Self {
        self.fifo_threshold = threshold;
        self
    }

    /// Checked against [`crate::hal::IRQ_PRIORITY_LEVELS`] when sampling starts.
    pub const fn with_irq_priority(mut self, priority: u8) -> Self {
        self.irq_priority = priority;
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "config")]
mod config {
    use std::{error::Error, path::Path};

    use super::Settings;

    const FILE_NAME: &str = "sampler-config.toml";

    impl Settings {
        /// Read settings from `path`, or from the first `sampler-config.toml`
        /// found in the current directory or one of its ancestors.
        pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
            let paths = match path {
                Some(p) => vec![p.into()],
                None => std::env::current_dir()?
                    .ancestors()
                    .map(|path| path.join(FILE_NAME))
                    .collect(),
            };

            let mut last_error = None;

            for path in paths {
                match std::fs::read_to_string(path) {
                    Ok(config_string) => return Ok(Self::from_toml(&config_string)?),
                    Err(e) => last_error = Some(e),
                }
            }

            Err(last_error
                .map(Into::into)
                .unwrap_or_else(|| format!("no {FILE_NAME} found").into()))
        }

        pub fn from_toml(config: &str) -> Result<Self, toml::de::Error> {
            toml::from_str(config)
        }
    }
}
