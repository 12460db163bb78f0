//! A register-level stand-in for the sampler peripherals.
//!
//! [`RegisterSim`] keeps the state the real registers would end up in and
//! logs every call, so a bring-up sequence can be checked without hardware.
//! It can also play the DMA engine and write conversions into the ring,
//! holding them in the stream FIFO until its threshold is reached like the
//! hardware does.

use crate::{
    hal::{
        AdcCommonConfig, AdcConfig, DmaConfig, Peripheral, SampleTime, SamplerHal, TimerConfig,
    },
    pin_map::PinInfo,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    EnableClock(Peripheral),
    SetAnalog(PinInfo),
    ReserveDmaInterrupt(u8),
    ConfigureTimer(TimerConfig),
    ConfigureDma(DmaConfig),
    ConfigureAdcs(AdcCommonConfig, AdcConfig),
    BindChannel(u8, SampleTime),
    EnableDmaRequests,
    EnableAdcs,
    StartConversion,
    DisableAdcs,
    DisableDma,
    DisableTimer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    pub clocks: [bool; 4],
    pub analog_pin: Option<PinInfo>,
    pub irq_priority: Option<u8>,
    pub timer: Option<TimerConfig>,
    pub timer_enabled: bool,
    pub dma: Option<DmaConfig>,
    pub dma_enabled: bool,
    /// Remaining transfers, like `NDTR`.
    pub ndtr: u16,
    pub adc_common: Option<AdcCommonConfig>,
    pub adc: Option<AdcConfig>,
    pub channel: Option<(u8, SampleTime)>,
    pub dma_requests: bool,
    pub adcs_enabled: bool,
}

impl Registers {
    pub fn clock_enabled(&self, peripheral: Peripheral) -> bool {
        self.clocks[peripheral as usize]
    }
}

#[derive(Debug, Default)]
pub struct RegisterSim {
    registers: Registers,
    calls: Vec<Call>,
    conversions: u64,
    /// Read from the ADC but not yet written to memory.
    fifo: Vec<u16>,
    /// Next memory slot the FIFO drains into.
    memory_index: usize,
}

impl RegisterSim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Conversion pairs completed since creation.
    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    /// Everything between the timer trigger and the memory write is
    /// configured and running.
    pub fn is_streaming(&self) -> bool {
        let r = &self.registers;
        r.clocks.iter().all(|&on| on)
            && r.timer_enabled
            && r.dma_enabled
            && r.adcs_enabled
            && r.dma_requests
            && r.channel.is_some()
    }

    /// Let the timer fire once per pair in `samples`, writing ADC1 then ADC2
    /// results into the ring. Returns the number of half-words written.
    pub fn trigger(&mut self, samples: &[(u16, u16)]) -> usize {
        let mut written = 0;
        for &(adc1, adc2) in samples {
            if !self.is_streaming() {
                break;
            }
            self.transfer(adc1);
            self.transfer(adc2);
            self.conversions += 1;
            written += 2;
        }
        written
    }

    /// Half-words counted off `NDTR` that are still in the FIFO.
    pub fn fifo_level(&self) -> usize {
        self.fifo.len()
    }

    fn transfer(&mut self, value: u16) {
        let Some(dma) = self.registers.dma else {
            return;
        };

        self.fifo.push(value);
        self.registers.ndtr -= 1;
        if self.registers.ndtr == 0 {
            self.registers.ndtr = dma.len;
        }

        if self.fifo.len() >= usize::from(dma.fifo_threshold.half_words()) {
            self.drain_fifo();
        }
    }

    fn drain_fifo(&mut self) {
        let Some(dma) = self.registers.dma else {
            return;
        };

        for value in self.fifo.drain(..) {
            // SAFETY: `memory_index` stays below `len`, and the sampler keeps
            // the buffer alive while the stream is enabled
            unsafe { dma.memory.add(self.memory_index).write_volatile(value) };
            self.memory_index = (self.memory_index + 1) % usize::from(dma.len);
        }
    }
}

impl SamplerHal for RegisterSim {
    fn enable_clock(&mut self, peripheral: Peripheral) {
        self.calls.push(Call::EnableClock(peripheral));
        self.registers.clocks[peripheral as usize] = true;
    }

    fn set_analog(&mut self, pin: PinInfo) {
        self.calls.push(Call::SetAnalog(pin));
        self.registers.analog_pin = Some(pin);
    }

    fn reserve_dma_interrupt(&mut self, priority: u8) {
        self.calls.push(Call::ReserveDmaInterrupt(priority));
        self.registers.irq_priority = Some(priority);
    }

    fn configure_timer(&mut self, config: &TimerConfig) {
        self.calls.push(Call::ConfigureTimer(*config));
        self.registers.timer = Some(*config);
        self.registers.timer_enabled = true;
    }

    fn configure_dma(&mut self, config: &DmaConfig) {
        self.calls.push(Call::ConfigureDma(*config));
        self.registers.dma = Some(*config);
        self.registers.ndtr = config.len;
        self.registers.dma_enabled = true;
        self.fifo.clear();
        self.memory_index = 0;
    }

    fn configure_adcs(&mut self, common: &AdcCommonConfig, adc: &AdcConfig) {
        self.calls.push(Call::ConfigureAdcs(*common, *adc));
        self.registers.adc_common = Some(*common);
        self.registers.adc = Some(*adc);
    }

    fn bind_channel(&mut self, channel: u8, sample_time: SampleTime) {
        self.calls.push(Call::BindChannel(channel, sample_time));
        self.registers.channel = Some((channel, sample_time));
    }

    fn enable_dma_requests(&mut self) {
        self.calls.push(Call::EnableDmaRequests);
        self.registers.dma_requests = true;
    }

    fn enable_adcs(&mut self) {
        self.calls.push(Call::EnableAdcs);
        self.registers.adcs_enabled = true;
    }

    fn start_conversion(&mut self) {
        self.calls.push(Call::StartConversion);
    }

    fn disable_adcs(&mut self) {
        self.calls.push(Call::DisableAdcs);
        self.registers.adcs_enabled = false;
    }

    fn disable_dma(&mut self) {
        self.calls.push(Call::DisableDma);
        // Disabling a peripheral-to-memory stream flushes what is left
        self.drain_fifo();
        self.registers.dma_enabled = false;
    }

    fn disable_timer(&mut self) {
        self.calls.push(Call::DisableTimer);
        self.registers.timer_enabled = false;
    }

    fn dma_remaining(&self) -> u16 {
        self.registers.ndtr
    }
}
