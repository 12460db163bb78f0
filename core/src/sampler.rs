use core::mem;
use core::ptr;

use fugit::HertzU32;

use crate::{
    hal::{
        AdcCommonConfig, AdcConfig, Alignment, DmaConfig, Peripheral, Resolution, SamplerHal,
        TimerConfig, TriggerEdge, ADC_CDR_ADDRESS, DMA_CHANNEL, IRQ_PRIORITY_LEVELS,
    },
    pin_map::{self, PinId, PinInfo},
    resources::{Claim, Resource, ResourceLock},
    sample::DualSample,
    timer::TimerPeriod,
    Error, Settings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Never started, the hardware has not been touched.
    Unconfigured,
    /// Timer, ADCs and DMA run on their own and overwrite the buffer.
    Sampling,
    /// Stopped. The buffer keeps the last ring contents.
    Idle,
}

/// Continuous dual-ADC capture of one pin into a circular buffer.
///
/// TIM3 triggers ADC1 and ADC2 simultaneously on every update, and DMA2
/// stream 0 moves both results into `buffer`, wrapping at its end, until
/// [`Sampler::stop`] is called or the sampler is dropped.
pub struct Sampler<'r, H: SamplerHal> {
    /// Only `None` inside `release`.
    hal: Option<H>,
    resources: &'r ResourceLock,
    claim: Option<Claim<'r>>,
    pin: PinId,
    pin_info: PinInfo,
    channel: u8,
    buffer: &'static mut [u16],
    settings: Settings,
    state: State,
}

impl<'r, H: SamplerHal> Sampler<'r, H> {
    /// Bind a pin and a buffer. Does not touch the hardware.
    pub fn new(
        hal: H,
        resources: &'r ResourceLock,
        pin: PinId,
        buffer: &'static mut [u16],
        settings: Settings,
    ) -> Result<Self, Error> {
        let pin_info = pin_map::adc_pin_info(pin).ok_or(Error::InvalidPin(pin))?;
        let channel = pin_info.adc_channel.ok_or(Error::InvalidPin(pin))?;

        if buffer.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        if u16::try_from(buffer.len()).is_err() {
            return Err(Error::BufferTooLarge(buffer.len()));
        }

        Ok(Self {
            hal: Some(hal),
            resources,
            claim: None,
            pin,
            pin_info,
            channel,
            buffer,
            settings,
            state: State::Unconfigured,
        })
    }

    /// Start sampling at `frequency`.
    ///
    /// Every check happens before the first register write. Calling this
    /// again after [`Sampler::stop`] runs the full sequence again.
    pub fn start(&mut self, frequency: HertzU32) -> Result<(), Error> {
        if self.state == State::Sampling {
            return Err(Error::AlreadySampling);
        }
        if self.settings.irq_priority >= IRQ_PRIORITY_LEVELS {
            return Err(Error::InvalidIrqPriority(self.settings.irq_priority));
        }

        let period = TimerPeriod::for_rate(self.settings.timer_clock(), frequency)?;
        let claim = self.resources.claim(&Resource::ALL).map_err(|e| {
            warn!("Cannot start sampling pin {}: {}", self.pin, e);
            e
        })?;

        let timer = TimerConfig {
            period,
            prescaler: 0,
        };
        let dma = DmaConfig {
            channel: DMA_CHANNEL,
            peripheral_address: ADC_CDR_ADDRESS,
            memory: self.buffer.as_mut_ptr(),
            // Checked in `new`
            len: self.buffer.len() as u16,
            priority: self.settings.dma_priority,
            fifo_threshold: self.settings.fifo_threshold,
        };
        let common = AdcCommonConfig {
            prescaler: self.settings.adc_prescaler,
            sampling_delay: self.settings.sampling_delay,
        };
        let adc = AdcConfig {
            resolution: Resolution::Bits12,
            alignment: Alignment::Left,
            trigger_edge: TriggerEdge::Rising,
            conversions: 1,
        };

        let hal = present(self.hal.as_mut());

        hal.enable_clock(Peripheral::Dma2);
        hal.enable_clock(Peripheral::Adc1);
        hal.enable_clock(Peripheral::Adc2);
        hal.enable_clock(Peripheral::Tim3);

        hal.set_analog(self.pin_info);
        hal.reserve_dma_interrupt(self.settings.irq_priority);

        hal.configure_timer(&timer);
        hal.configure_dma(&dma);
        hal.configure_adcs(&common, &adc);
        hal.bind_channel(self.channel, self.settings.sample_time);
        hal.enable_dma_requests();

        hal.enable_adcs();
        // The first conversion is started by hand, TIM3 TRGO triggers the rest
        hal.start_conversion();

        self.claim = Some(claim);
        self.state = State::Sampling;

        info!(
            "Sampling pin {} (channel {}) at {} Hz, timer period {}",
            self.pin,
            self.channel,
            period.actual_rate(self.settings.timer_clock()).to_Hz(),
            period.bits()
        );

        Ok(())
    }

    /// Stop the ADCs, the DMA stream and the timer, in that order.
    ///
    /// Clocks and pin mode are left as they are. Does nothing unless
    /// sampling.
    pub fn stop(&mut self) {
        if self.state != State::Sampling {
            return;
        }

        if let Some(hal) = self.hal.as_mut() {
            hal.disable_adcs();
            hal.disable_dma();
            hal.disable_timer();
        }

        self.claim = None;
        self.state = State::Idle;

        debug!("Stopped sampling pin {}", self.pin);
    }

    /// Stop, then give back the hardware and the buffer.
    pub fn release(mut self) -> (H, &'static mut [u16]) {
        self.stop();

        let hal = present(self.hal.take());
        let buffer = mem::take(&mut self.buffer);
        (hal, buffer)
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_sampling(&self) -> bool {
        self.state == State::Sampling
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn hal(&self) -> &H {
        present(self.hal.as_ref())
    }

    /// Direct access to the hardware. Writing registers behind the sampler's
    /// back while it is sampling is on the caller.
    pub fn hal_mut(&mut self) -> &mut H {
        present(self.hal.as_mut())
    }

    /// The buffer, as long as the DMA isn't writing to it.
    pub fn buffer(&self) -> Option<&[u16]> {
        match self.state {
            State::Sampling => None,
            State::Unconfigured | State::Idle => Some(&*self.buffer),
        }
    }

    /// Index of the next transfer the DMA stream takes from the ADCs
    /// (`len - NDTR`). After a stop this is where it would have continued.
    ///
    /// While sampling, the stream FIFO may still hold the last few of these
    /// transfers, so the ring in memory can lag behind this position.
    pub fn write_position(&self) -> Option<usize> {
        if self.state == State::Unconfigured {
            return None;
        }

        let len = self.buffer.len();
        let remaining = usize::from(self.hal().dma_remaining());
        Some(if remaining == 0 || remaining > len {
            0
        } else {
            len - remaining
        })
    }

    /// Transfers that may sit in the FIFO instead of memory. The FIFO drains
    /// once it reaches its threshold, and disabling the stream flushes it.
    fn in_flight(&self) -> usize {
        match self.state {
            State::Sampling => usize::from(self.settings.fifo_threshold.half_words()) - 1,
            State::Unconfigured | State::Idle => 0,
        }
    }

    /// End of the data known to be in memory, and how many slots before it
    /// hold samples in chronological order.
    fn settled(&self) -> Option<(usize, usize)> {
        let position = self.write_position()?;
        let len = self.buffer.len();
        let in_flight = self.in_flight().min(len);

        Some(((position + len - in_flight) % len, len - in_flight))
    }

    fn read(&self, index: usize) -> u16 {
        let len = self.buffer.len();
        // SAFETY: the index is reduced modulo the buffer length
        unsafe { ptr::read_volatile(self.buffer.as_ptr().add(index % len)) }
    }

    /// Copy the newest samples that reached memory, oldest first, into
    /// `out`. Returns how many were copied.
    ///
    /// While sampling this leaves out the slots the FIFO may not have
    /// written yet, so at most `len - threshold + 1` samples come back. The
    /// DMA keeps running while this reads, so the oldest copied values may
    /// already have been overwritten by newer ones.
    pub fn copy_latest(&self, out: &mut [u16]) -> usize {
        let Some((end, available)) = self.settled() else {
            return 0;
        };

        let len = self.buffer.len();
        let count = out.len().min(available);
        let start = end + len - count;

        for (i, slot) in out[..count].iter_mut().enumerate() {
            *slot = self.read(start + i);
        }

        count
    }

    /// Like [`Sampler::copy_latest`], but as ADC1/ADC2 pairs of the same
    /// trigger. A half-written newest pair is left out.
    ///
    /// Needs an even buffer length, otherwise pairs change parity on every
    /// lap and nothing is copied.
    pub fn copy_latest_pairs(&self, out: &mut [DualSample]) -> usize {
        let len = self.buffer.len();
        if len % 2 != 0 {
            return 0;
        }
        let Some((end, available)) = self.settled() else {
            return 0;
        };

        let odd = end % 2;
        let end = end - odd;
        let count = out.len().min(available.saturating_sub(odd) / 2);
        let start = end + len - 2 * count;

        for (i, pair) in out[..count].iter_mut().enumerate() {
            *pair = DualSample {
                adc1: self.read(start + 2 * i),
                adc2: self.read(start + 2 * i + 1),
            };
        }

        count
    }
}

/// The hardware is only taken out by `release`, which consumes the sampler.
fn present<T>(hal: Option<T>) -> T {
    match hal {
        Some(hal) => hal,
        None => unreachable!("sampler hardware used after release"),
    }
}

impl<H: SamplerHal> Drop for Sampler<'_, H> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{
        AdcPrescaler, DmaPriority, FifoThreshold, SampleTime, SamplingDelay,
    };
    use crate::pin_map::{A0, A1, A3, D0};
    use crate::sim::{Call, RegisterSim, Registers};
    use fugit::RateExtU32;
    use static_cell::StaticCell;

    fn sampler<'a>(lock: &'a ResourceLock, buffer: &'static mut [u16]) -> Sampler<'a, RegisterSim> {
        Sampler::new(RegisterSim::new(), lock, A0, buffer, Settings::default()).unwrap()
    }

    #[test]
    fn construction_touches_no_hardware() {
        static BUFFER: StaticCell<[u16; 16]> = StaticCell::new();
        let lock = ResourceLock::new();

        let s = sampler(&lock, BUFFER.init([0; 16]));

        assert!(s.hal().calls().is_empty());
        assert_eq!(s.hal().registers(), &Registers::default());
        assert_eq!(s.state(), State::Unconfigured);
        assert_eq!(s.channel(), 3);
        assert_eq!(s.len(), 16);
        assert_eq!(s.buffer(), Some(&[0; 16][..]));
        assert_eq!(s.write_position(), None);
        assert_eq!(s.copy_latest(&mut [0; 4]), 0);
        assert!(Resource::ALL.iter().all(|&r| !lock.is_held(r)));
    }

    #[test]
    fn construction_is_validated() {
        let lock = ResourceLock::new();
        let new = |pin: PinId, buffer: &'static mut [u16]| {
            Sampler::new(RegisterSim::new(), &lock, pin, buffer, Settings::default()).err()
        };

        assert_eq!(
            new(D0, Box::leak(vec![0; 4].into_boxed_slice())),
            Some(Error::InvalidPin(D0))
        );
        assert_eq!(
            new(A3, Box::leak(vec![0; 4].into_boxed_slice())),
            Some(Error::InvalidPin(A3))
        );
        assert_eq!(
            new(PinId(200), Box::leak(vec![0; 4].into_boxed_slice())),
            Some(Error::InvalidPin(PinId(200)))
        );
        assert_eq!(new(A0, Default::default()), Some(Error::EmptyBuffer));
        assert_eq!(
            new(A0, Box::leak(vec![0; 65_536].into_boxed_slice())),
            Some(Error::BufferTooLarge(65_536))
        );
        assert_eq!(new(A0, Box::leak(vec![0; 65_535].into_boxed_slice())), None);
    }

    #[test]
    fn start_sequence() {
        static BUFFER: StaticCell<[u16; 16]> = StaticCell::new();
        let buffer = BUFFER.init([0; 16]);
        let memory = buffer.as_mut_ptr();
        let lock = ResourceLock::new();

        let mut s = sampler(&lock, buffer);
        s.start(8.kHz()).unwrap();

        let expected = [
            Call::EnableClock(Peripheral::Dma2),
            Call::EnableClock(Peripheral::Adc1),
            Call::EnableClock(Peripheral::Adc2),
            Call::EnableClock(Peripheral::Tim3),
            Call::SetAnalog(pin_map::adc_pin_info(A0).unwrap()),
            Call::ReserveDmaInterrupt(0),
            Call::ConfigureTimer(TimerConfig {
                period: TimerPeriod::for_rate(HertzU32::MHz(60), 8.kHz()).unwrap(),
                prescaler: 0,
            }),
            Call::ConfigureDma(DmaConfig {
                channel: 0,
                peripheral_address: 0x4001_2308,
                memory,
                len: 16,
                priority: DmaPriority::High,
                fifo_threshold: FifoThreshold::HalfFull,
            }),
            Call::ConfigureAdcs(
                AdcCommonConfig {
                    prescaler: AdcPrescaler::Div2,
                    sampling_delay: SamplingDelay::Cycles5,
                },
                AdcConfig {
                    resolution: Resolution::Bits12,
                    alignment: Alignment::Left,
                    trigger_edge: TriggerEdge::Rising,
                    conversions: 1,
                },
            ),
            Call::BindChannel(3, SampleTime::Cycles15),
            Call::EnableDmaRequests,
            Call::EnableAdcs,
            Call::StartConversion,
        ];

        assert_eq!(s.hal().calls(), &expected[..]);
        assert_eq!(s.state(), State::Sampling);
        assert!(s.hal().is_streaming());
        assert_eq!(
            s.hal().registers().timer.map(|t| t.period.bits()),
            Some(7499)
        );
        assert!(Resource::ALL.iter().all(|&r| lock.is_held(r)));
    }

    #[test]
    fn bad_frequencies_touch_no_hardware() {
        static BUFFER: StaticCell<[u16; 16]> = StaticCell::new();
        let lock = ResourceLock::new();
        let mut s = sampler(&lock, BUFFER.init([0; 16]));

        assert_eq!(s.start(0.Hz()), Err(Error::ZeroFrequency));
        assert_eq!(s.start(1.Hz()), Err(Error::FrequencyTooLow(1)));
        assert_eq!(s.start(60.MHz()), Err(Error::FrequencyTooHigh(60_000_000)));

        assert!(s.hal().calls().is_empty());
        assert_eq!(s.state(), State::Unconfigured);
        assert!(!lock.is_held(Resource::Tim3));
    }

    #[test]
    fn stop_order_and_idempotence() {
        static BUFFER: StaticCell<[u16; 16]> = StaticCell::new();
        let lock = ResourceLock::new();
        let mut s = sampler(&lock, BUFFER.init([0; 16]));

        // Stopping something that never ran is a no-op
        s.stop();
        assert!(s.hal().calls().is_empty());
        assert_eq!(s.state(), State::Unconfigured);

        s.start(8.kHz()).unwrap();
        s.hal_mut().clear_calls();

        s.stop();
        assert_eq!(
            s.hal().calls(),
            &[Call::DisableAdcs, Call::DisableDma, Call::DisableTimer][..]
        );
        assert_eq!(s.state(), State::Idle);
        assert!(!lock.is_held(Resource::Dma2Stream0));

        // Clocks and pin stay configured
        let registers = s.hal().registers();
        assert!(registers.clock_enabled(Peripheral::Tim3));
        assert!(registers.clock_enabled(Peripheral::Adc2));
        assert_eq!(registers.analog_pin, pin_map::adc_pin_info(A0));
        assert!(!s.hal().is_streaming());

        s.hal_mut().clear_calls();
        s.stop();
        assert!(s.hal().calls().is_empty());
    }

    #[test]
    fn restart_reproduces_register_state() {
        static BUFFER: StaticCell<[u16; 32]> = StaticCell::new();
        let lock = ResourceLock::new();
        let mut s = sampler(&lock, BUFFER.init([0; 32]));

        s.start(44_100.Hz()).unwrap();
        let first_registers = *s.hal().registers();
        let first_calls = s.hal().calls().to_vec();

        s.stop();
        s.hal_mut().clear_calls();
        s.start(44_100.Hz()).unwrap();

        assert_eq!(s.hal().registers(), &first_registers);
        assert_eq!(s.hal().calls(), &first_calls[..]);
    }

    #[test]
    fn double_start_is_rejected() {
        static BUFFER: StaticCell<[u16; 16]> = StaticCell::new();
        let lock = ResourceLock::new();
        let mut s = sampler(&lock, BUFFER.init([0; 16]));

        s.start(8.kHz()).unwrap();
        s.hal_mut().clear_calls();

        assert_eq!(s.start(16.kHz()), Err(Error::AlreadySampling));
        assert!(s.hal().calls().is_empty());
        assert_eq!(
            s.hal().registers().timer.map(|t| t.period.bits()),
            Some(7499)
        );
    }

    #[test]
    fn samplers_sharing_hardware_conflict() {
        static FIRST: StaticCell<[u16; 16]> = StaticCell::new();
        static SECOND: StaticCell<[u16; 16]> = StaticCell::new();
        let lock = ResourceLock::new();

        let mut first = sampler(&lock, FIRST.init([0; 16]));
        let mut second = Sampler::new(
            RegisterSim::new(),
            &lock,
            A1,
            SECOND.init([0; 16]),
            Settings::default(),
        )
        .unwrap();

        first.start(8.kHz()).unwrap();
        assert_eq!(
            second.start(8.kHz()),
            Err(Error::ResourceBusy(Resource::Tim3))
        );
        assert!(second.hal().calls().is_empty());
        assert_eq!(second.state(), State::Unconfigured);

        first.stop();
        second.start(8.kHz()).unwrap();
        assert_eq!(first.start(8.kHz()), Err(Error::ResourceBusy(Resource::Tim3)));

        // Dropping a running sampler hands its hardware back
        drop(second);
        assert!(Resource::ALL.iter().all(|&r| !lock.is_held(r)));
        first.start(8.kHz()).unwrap();
    }

    #[test]
    fn dropping_a_running_sampler_stops_the_hardware() {
        static BUFFER: StaticCell<[u16; 8]> = StaticCell::new();
        let lock = ResourceLock::new();
        let mut sim = RegisterSim::new();

        {
            let mut s =
                Sampler::new(&mut sim, &lock, A0, BUFFER.init([0; 8]), Settings::default())
                    .unwrap();
            s.start(8.kHz()).unwrap();
            assert!(s.hal().is_streaming());
        }

        assert!(!sim.is_streaming());
        assert_eq!(
            &sim.calls()[sim.calls().len() - 3..],
            &[Call::DisableAdcs, Call::DisableDma, Call::DisableTimer][..]
        );
        assert!(!lock.is_held(Resource::Tim3));
    }

    #[test]
    fn release_stops_and_returns_parts() {
        static BUFFER: StaticCell<[u16; 8]> = StaticCell::new();
        let lock = ResourceLock::new();
        let mut s = sampler(&lock, BUFFER.init([0; 8]));

        s.start(8.kHz()).unwrap();
        s.hal_mut().trigger(&[(0x10, 0x11)]);

        let (sim, buffer) = s.release();
        assert_eq!(
            &sim.calls()[sim.calls().len() - 3..],
            &[Call::DisableAdcs, Call::DisableDma, Call::DisableTimer][..]
        );
        assert_eq!(buffer, &[0x10, 0x11, 0, 0, 0, 0, 0, 0][..]);
        assert!(!lock.is_held(Resource::Adc1));

        // The buffer can be bound again
        let mut again = sampler(&lock, buffer);
        again.start(8.kHz()).unwrap();
    }

    #[test]
    fn ring_capture() {
        static BUFFER: StaticCell<[u16; 8]> = StaticCell::new();
        let lock = ResourceLock::new();
        let mut s = sampler(&lock, BUFFER.init([0; 8]));

        s.start(8.kHz()).unwrap();
        assert_eq!(s.write_position(), Some(0));
        assert_eq!(s.buffer(), None);

        // The FIFO drains every 4 half-words, the third pair is still in it
        s.hal_mut().trigger(&[(0x10, 0x11), (0x20, 0x21), (0x30, 0x31)]);
        assert_eq!(s.write_position(), Some(6));
        assert_eq!(s.hal().fifo_level(), 2);

        let mut out = [0; 3];
        assert_eq!(s.copy_latest(&mut out), 3);
        assert_eq!(out, [0x10, 0x11, 0x20]);

        // Wraps around the end without stopping
        s.hal_mut().trigger(&[(0x40, 0x41), (0x50, 0x51), (0x60, 0x61)]);
        assert_eq!(s.write_position(), Some(4));
        assert_eq!(s.hal().fifo_level(), 0);

        let mut out = [0; 10];
        assert_eq!(s.copy_latest(&mut out), 5);
        assert_eq!(out[..5], [0x30, 0x31, 0x40, 0x41, 0x50]);

        let mut pairs = [DualSample { adc1: 0, adc2: 0 }; 4];
        assert_eq!(s.copy_latest_pairs(&mut pairs), 2);
        assert_eq!(
            pairs[..2],
            [
                DualSample { adc1: 0x30, adc2: 0x31 },
                DualSample { adc1: 0x40, adc2: 0x41 },
            ]
        );

        s.stop();
        assert_eq!(s.hal_mut().trigger(&[(0x70, 0x71)]), 0);
        assert_eq!(s.hal().conversions(), 6);
        assert_eq!(s.write_position(), Some(4));
        assert_eq!(
            s.buffer(),
            Some(&[0x50, 0x51, 0x60, 0x61, 0x30, 0x31, 0x40, 0x41][..])
        );

        // Once stopped every slot is settled
        let mut out = [0; 8];
        assert_eq!(s.copy_latest(&mut out), 8);
        assert_eq!(out, [0x30, 0x31, 0x40, 0x41, 0x50, 0x51, 0x60, 0x61]);
        assert_eq!(s.copy_latest_pairs(&mut pairs), 4);
        assert_eq!(pairs[3], DualSample { adc1: 0x60, adc2: 0x61 });
    }

    #[test]
    fn newest_samples_skip_the_fifo() {
        static HALF: StaticCell<[u16; 8]> = StaticCell::new();
        static QUARTER: StaticCell<[u16; 8]> = StaticCell::new();
        let lock = ResourceLock::new();
        const STALE: u16 = 0xFFFF;

        let mut s = sampler(&lock, HALF.init([STALE; 8]));
        s.start(8.kHz()).unwrap();
        s.hal_mut().trigger(&[(0x10, 0x11), (0x20, 0x21), (0x30, 0x31)]);

        // Slots 4 and 5 are counted off NDTR but still hold the last lap
        let mut out = [0; 8];
        assert_eq!(s.copy_latest(&mut out), 5);
        assert_eq!(out[..5], [STALE, STALE, 0x10, 0x11, 0x20]);

        let mut pairs = [DualSample { adc1: 0, adc2: 0 }; 1];
        assert_eq!(s.copy_latest_pairs(&mut pairs), 1);
        assert_eq!(pairs[0], DualSample { adc1: 0x10, adc2: 0x11 });
        drop(s);

        let settings = Settings::new().with_fifo_threshold(FifoThreshold::Quarter);
        let mut s =
            Sampler::new(RegisterSim::new(), &lock, A0, QUARTER.init([STALE; 8]), settings)
                .unwrap();
        s.start(8.kHz()).unwrap();
        s.hal_mut().trigger(&[(0x10, 0x11), (0x20, 0x21), (0x30, 0x31)]);

        assert_eq!(s.copy_latest(&mut out), 7);
        assert_eq!(out[..7], [STALE, STALE, 0x10, 0x11, 0x20, 0x21, 0x30]);
        assert_eq!(s.copy_latest_pairs(&mut pairs), 1);
        assert_eq!(pairs[0], DualSample { adc1: 0x20, adc2: 0x21 });
    }

    #[test]
    fn odd_buffers_have_no_pairs() {
        static BUFFER: StaticCell<[u16; 7]> = StaticCell::new();
        let lock = ResourceLock::new();
        let mut s = sampler(&lock, BUFFER.init([0; 7]));

        s.start(8.kHz()).unwrap();
        s.hal_mut().trigger(&[(0x10, 0x11), (0x20, 0x21)]);
        s.stop();

        let mut pairs = [DualSample { adc1: 0, adc2: 0 }; 2];
        assert_eq!(s.copy_latest_pairs(&mut pairs), 0);
        assert_eq!(s.copy_latest(&mut [0; 4]), 4);
    }

    #[test]
    fn bad_settings_touch_no_hardware() {
        static BUFFER: StaticCell<[u16; 16]> = StaticCell::new();
        let lock = ResourceLock::new();
        let mut s = Sampler::new(
            RegisterSim::new(),
            &lock,
            A0,
            BUFFER.init([0; 16]),
            Settings::new().with_irq_priority(16),
        )
        .unwrap();

        assert_eq!(s.start(8.kHz()), Err(Error::InvalidIrqPriority(16)));

        let (sim, buffer) = s.release();
        assert!(sim.calls().is_empty());

        let mut s = Sampler::new(
            sim,
            &lock,
            A0,
            buffer,
            Settings::new().with_timer_clock(0.Hz()),
        )
        .unwrap();
        assert_eq!(s.start(8.kHz()), Err(Error::ZeroTimerClock));
        assert!(s.hal().calls().is_empty());
        assert!(!lock.is_held(Resource::Tim3));

        let (sim, buffer) = s.release();
        let mut s = Sampler::new(
            sim,
            &lock,
            A0,
            buffer,
            Settings::new().with_irq_priority(IRQ_PRIORITY_LEVELS - 1),
        )
        .unwrap();
        s.start(8.kHz()).unwrap();
        assert_eq!(s.hal().registers().irq_priority, Some(15));
    }

    #[test]
    fn settings_reach_the_registers() {
        static BUFFER: StaticCell<[u16; 16]> = StaticCell::new();
        let lock = ResourceLock::new();
        let settings = Settings::new()
            .with_timer_clock(108.MHz())
            .with_adc_prescaler(AdcPrescaler::Div4)
            .with_sampling_delay(SamplingDelay::Cycles10)
            .with_sample_time(SampleTime::Cycles84)
            .with_dma_priority(DmaPriority::VeryHigh);

        let mut s = Sampler::new(
            RegisterSim::new(),
            &lock,
            A1,
            BUFFER.init([0; 16]),
            settings,
        )
        .unwrap();
        s.start(48.kHz()).unwrap();

        let registers = s.hal().registers();
        assert_eq!(registers.timer.map(|t| t.period.bits()), Some(2249));
        assert_eq!(registers.channel, Some((10, SampleTime::Cycles84)));
        assert_eq!(
            registers.adc_common,
            Some(AdcCommonConfig {
                prescaler: AdcPrescaler::Div4,
                sampling_delay: SamplingDelay::Cycles10,
            })
        );
        assert_eq!(
            registers.dma.map(|d| d.priority),
            Some(DmaPriority::VeryHigh)
        );
    }
}
