//! The register-level side of the sampler.
//!
//! [`SamplerHal`] has one method per step of the bring-up and teardown
//! sequence. [`crate::Sampler`] decides the order and the values, an
//! implementation only has to write registers.

use serde::{Deserialize, Serialize};

use crate::{pin_map::PinInfo, timer::TimerPeriod};

/// Common data register of the ADC block, holding ADC1 and ADC2 results
/// packed side by side in dual mode.
pub const ADC_CDR_ADDRESS: u32 = 0x4001_2308;

/// DMA2 stream 0 channel 0 is wired to ADC1 requests, which carry the dual
/// mode data.
pub const DMA_CHANNEL: u8 = 0;

/// STM32F2/F4/F7 implement 4 NVIC priority bits.
pub const IRQ_PRIORITY_LEVELS: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    Dma2,
    Adc1,
    Adc2,
    Tim3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum AdcPrescaler {
    Div2,
    Div4,
    Div6,
    Div8,
}

impl AdcPrescaler {
    /// `ADCPRE` field of `ADC_CCR`
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Delay between the sampling phases of the two ADCs in dual mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum SamplingDelay {
    Cycles5,
    Cycles6,
    Cycles7,
    Cycles8,
    Cycles9,
    Cycles10,
    Cycles11,
    Cycles12,
    Cycles13,
    Cycles14,
    Cycles15,
    Cycles16,
    Cycles17,
    Cycles18,
    Cycles19,
    Cycles20,
}

impl SamplingDelay {
    /// `DELAY` field of `ADC_CCR`
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum SampleTime {
    Cycles3,
    Cycles15,
    Cycles28,
    Cycles56,
    Cycles84,
    Cycles112,
    Cycles144,
    Cycles480,
}

impl SampleTime {
    /// `SMPx` field of `ADC_SMPR1`/`ADC_SMPR2`
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum DmaPriority {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl DmaPriority {
    /// `PL` field of `DMA_SxCR`
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum FifoThreshold {
    Quarter,
    HalfFull,
    ThreeQuarters,
    Full,
}

impl FifoThreshold {
    /// `FTH` field of `DMA_SxFCR`
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Half-words collected before the FIFO drains to memory. The FIFO is
    /// four words deep.
    pub const fn half_words(self) -> u16 {
        2 * (self as u16 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Bits12,
    Bits10,
    Bits8,
    Bits6,
}

impl Resolution {
    /// `RES` field of `ADC_CR1`
    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn width(self) -> u8 {
        match self {
            Resolution::Bits12 => 12,
            Resolution::Bits10 => 10,
            Resolution::Bits8 => 8,
            Resolution::Bits6 => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alignment {
    Right,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerEdge {
    Rising,
    Falling,
    Both,
}

impl TriggerEdge {
    /// `EXTEN` field of `ADC_CR2`
    pub const fn bits(self) -> u8 {
        match self {
            TriggerEdge::Rising => 0b01,
            TriggerEdge::Falling => 0b10,
            TriggerEdge::Both => 0b11,
        }
    }
}

/// TIM3 time base. Always up-counting without clock division, with TRGO on
/// update, and enabled once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
    pub period: TimerPeriod,
    pub prescaler: u16,
}

/// DMA2 stream 0 setup. Always peripheral to memory, half-word on both
/// sides, memory increment, circular, single bursts and no interrupts. The
/// stream is enabled once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaConfig {
    pub channel: u8,
    pub peripheral_address: u32,
    pub memory: *mut u16,
    pub len: u16,
    pub priority: DmaPriority,
    pub fifo_threshold: FifoThreshold,
}

/// Common block of ADC1/ADC2, always in dual regular simultaneous mode with
/// DMA access mode 1 (one half-word per request, ADC1 first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcCommonConfig {
    pub prescaler: AdcPrescaler,
    pub sampling_delay: SamplingDelay,
}

/// Applied identically to ADC1 and ADC2. Scan and continuous mode are off
/// and the external trigger is TIM3 TRGO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcConfig {
    pub resolution: Resolution,
    pub alignment: Alignment,
    pub trigger_edge: TriggerEdge,
    /// Length of the regular sequence.
    pub conversions: u8,
}

pub trait SamplerHal {
    fn enable_clock(&mut self, peripheral: Peripheral);

    /// Analog mode, no pull.
    fn set_analog(&mut self, pin: PinInfo);

    /// Unmask the DMA2 stream 0 interrupt. The stream never raises it, so no
    /// handler has to exist. `priority` is below [`IRQ_PRIORITY_LEVELS`].
    fn reserve_dma_interrupt(&mut self, priority: u8);

    fn configure_timer(&mut self, config: &TimerConfig);

    fn configure_dma(&mut self, config: &DmaConfig);

    fn configure_adcs(&mut self, common: &AdcCommonConfig, adc: &AdcConfig);

    /// Put `channel` at rank 1 of both regular sequences.
    fn bind_channel(&mut self, channel: u8, sample_time: SampleTime);

    /// Keep issuing DMA requests after the last transfer (multi-ADC `DDS`).
    fn enable_dma_requests(&mut self);

    fn enable_adcs(&mut self);

    /// Software start on ADC1.
    fn start_conversion(&mut self);

    fn disable_adcs(&mut self);

    fn disable_dma(&mut self);

    fn disable_timer(&mut self);

    /// Transfers left before the stream wraps (`NDTR`). This counts reads
    /// from the ADC, so up to a FIFO threshold of them may not have reached
    /// memory yet.
    fn dma_remaining(&self) -> u16;
}

impl<H: SamplerHal + ?Sized> SamplerHal for &mut H {
    fn enable_clock(&mut self, peripheral: Peripheral) {
        H::enable_clock(self, peripheral)
    }

    fn set_analog(&mut self, pin: PinInfo) {
        H::set_analog(self, pin)
    }

    fn reserve_dma_interrupt(&mut self, priority: u8) {
        H::reserve_dma_interrupt(self, priority)
    }

    fn configure_timer(&mut self, config: &TimerConfig) {
        H::configure_timer(self, config)
    }

    fn configure_dma(&mut self, config: &DmaConfig) {
        H::configure_dma(self, config)
    }

    fn configure_adcs(&mut self, common: &AdcCommonConfig, adc: &AdcConfig) {
        H::configure_adcs(self, common, adc)
    }

    fn bind_channel(&mut self, channel: u8, sample_time: SampleTime) {
        H::bind_channel(self, channel, sample_time)
    }

    fn enable_dma_requests(&mut self) {
        H::enable_dma_requests(self)
    }

    fn enable_adcs(&mut self) {
        H::enable_adcs(self)
    }

    fn start_conversion(&mut self) {
        H::start_conversion(self)
    }

    fn disable_adcs(&mut self) {
        H::disable_adcs(self)
    }

    fn disable_dma(&mut self) {
        H::disable_dma(self)
    }

    fn disable_timer(&mut self) {
        H::disable_timer(self)
    }

    fn dma_remaining(&self) -> u16 {
        H::dma_remaining(self)
    }
}
