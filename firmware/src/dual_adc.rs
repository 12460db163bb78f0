use cortex_m::peripheral::NVIC;
use hal::{
    pac,
    rcc::{self, Enable},
};
use stm32f7xx_hal as hal;

use dual_adc_sampler::{
    hal::{
        AdcCommonConfig, AdcConfig, Alignment, DmaConfig, Peripheral, SampleTime, SamplerHal,
        TimerConfig,
    },
    pin_map::{PinInfo, Port},
};

/// `EXTSEL` value selecting TIM3 TRGO as the regular trigger
const EXTSEL_TIM3_TRGO: u8 = 0b1000;
/// `MULTI` value for dual mode, regular simultaneous only
const MULTI_DUAL_REGULAR: u8 = 0b00110;
/// `DMA` field of `ADC_CCR`, access mode 1
const DMA_MODE_1: u8 = 0b01;
/// `MMS` value routing the update event to TRGO
const MMS_UPDATE: u8 = 0b010;
/// Transfer complete, half transfer, error, direct mode error and FIFO error
/// flags of stream 0 in `LIFCR`
const STREAM0_FLAGS: u32 = 0b11_1101;

/// Peripheral buses taken out of the constrained RCC, used to clock the
/// sampler's peripherals once it is started.
pub struct Buses {
    pub ahb1: rcc::AHB1,
    pub apb1: rcc::APB1,
    pub apb2: rcc::APB2,
}

/// Sample time register and bit offset of an ADC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleTimeField {
    Smpr1(u32),
    Smpr2(u32),
}

impl SampleTimeField {
    pub fn for_channel(channel: u8) -> Self {
        if channel < 10 {
            SampleTimeField::Smpr2(3 * u32::from(channel))
        } else {
            SampleTimeField::Smpr1(3 * u32::from(channel - 10))
        }
    }

    pub fn apply(shift: u32, register: u32, sample_time: SampleTime) -> u32 {
        (register & !(0b111 << shift)) | (u32::from(sample_time.bits()) << shift)
    }
}

/// `MODER` with the pin in analog mode.
fn analog_moder(moder: u32, pin: u8) -> u32 {
    moder | (0b11 << (2 * u32::from(pin)))
}

/// `PUPDR` with the pin floating.
fn floating_pupdr(pupdr: u32, pin: u8) -> u32 {
    pupdr & !(0b11 << (2 * u32::from(pin)))
}

/// Clocks the pin's GPIO port and runs `$body` on its registers.
macro_rules! with_gpio {
    ($port:expr, $ahb1:expr, |$gpio:ident| $body:expr) => {
        match $port {
            Port::A => {
                <pac::GPIOA as Enable>::enable($ahb1);
                let $gpio = unsafe { &*pac::GPIOA::ptr() };
                $body
            }
            Port::B => {
                <pac::GPIOB as Enable>::enable($ahb1);
                let $gpio = unsafe { &*pac::GPIOB::ptr() };
                $body
            }
            Port::C => {
                <pac::GPIOC as Enable>::enable($ahb1);
                let $gpio = unsafe { &*pac::GPIOC::ptr() };
                $body
            }
            Port::D => {
                <pac::GPIOD as Enable>::enable($ahb1);
                let $gpio = unsafe { &*pac::GPIOD::ptr() };
                $body
            }
            Port::E => {
                <pac::GPIOE as Enable>::enable($ahb1);
                let $gpio = unsafe { &*pac::GPIOE::ptr() };
                $body
            }
            Port::F => {
                <pac::GPIOF as Enable>::enable($ahb1);
                let $gpio = unsafe { &*pac::GPIOF::ptr() };
                $body
            }
            Port::G => {
                <pac::GPIOG as Enable>::enable($ahb1);
                let $gpio = unsafe { &*pac::GPIOG::ptr() };
                $body
            }
        }
    };
}

/// Runs the same register writes on ADC1 and then ADC2.
macro_rules! both_adcs {
    ($this:expr, |$adc:ident| $body:expr) => {{
        {
            let $adc = &$this.adc1;
            $body
        }
        {
            let $adc = &$this.adc2;
            $body
        }
    }};
}

/// ADC1/ADC2 in dual regular simultaneous mode, paced by TIM3 and drained by
/// DMA2 stream 0.
pub struct Stm32DualAdc {
    adc1: pac::ADC1,
    adc2: pac::ADC2,
    adc_common: pac::ADC_COMMON,
    tim3: pac::TIM3,
    dma2: pac::DMA2,
    nvic: NVIC,
    buses: Buses,
}

impl Stm32DualAdc {
    /// Takes ownership only. Nothing is clocked or written until the sampler
    /// starts.
    pub fn new(
        adc1: pac::ADC1,
        adc2: pac::ADC2,
        adc_common: pac::ADC_COMMON,
        tim3: pac::TIM3,
        dma2: pac::DMA2,
        nvic: NVIC,
        buses: Buses,
    ) -> Self {
        Self {
            adc1,
            adc2,
            adc_common,
            tim3,
            dma2,
            nvic,
            buses,
        }
    }
}

impl SamplerHal for Stm32DualAdc {
    fn enable_clock(&mut self, peripheral: Peripheral) {
        match peripheral {
            Peripheral::Dma2 => <pac::DMA2 as Enable>::enable(&mut self.buses.ahb1),
            Peripheral::Adc1 => <pac::ADC1 as Enable>::enable(&mut self.buses.apb2),
            Peripheral::Adc2 => <pac::ADC2 as Enable>::enable(&mut self.buses.apb2),
            Peripheral::Tim3 => <pac::TIM3 as Enable>::enable(&mut self.buses.apb1),
        }
    }

    fn set_analog(&mut self, pin: PinInfo) {
        with_gpio!(pin.port, &mut self.buses.ahb1, |gpio| {
            gpio.moder
                .modify(|r, w| unsafe { w.bits(analog_moder(r.bits(), pin.pin)) });
            gpio.pupdr
                .modify(|r, w| unsafe { w.bits(floating_pupdr(r.bits(), pin.pin)) });
        })
    }

    fn reserve_dma_interrupt(&mut self, priority: u8) {
        // The sampler keeps `priority` within the implemented bits
        unsafe {
            self.nvic.set_priority(
                pac::Interrupt::DMA2_STREAM0,
                priority << (8 - pac::NVIC_PRIO_BITS),
            );
            NVIC::unmask(pac::Interrupt::DMA2_STREAM0);
        }
    }

    fn configure_timer(&mut self, config: &TimerConfig) {
        let tim3 = &self.tim3;
        tim3.cr1.modify(|_, w| w.cen().clear_bit());

        // Up-counting, no clock division
        tim3.cr1.modify(|_, w| unsafe {
            w.dir()
                .clear_bit()
                .cms()
                .bits(0b00)
                .ckd()
                .bits(0b00)
        });
        tim3.psc.write(|w| unsafe { w.psc().bits(config.prescaler) });
        tim3.arr
            .write(|w| unsafe { w.bits(u32::from(config.period.bits())) });
        // Load prescaler and period right away
        tim3.egr.write(|w| w.ug().set_bit());

        // Update event on TRGO, which triggers both ADCs
        tim3.cr2.modify(|_, w| unsafe { w.mms().bits(MMS_UPDATE) });

        tim3.cr1.modify(|_, w| w.cen().set_bit());
    }

    fn configure_dma(&mut self, config: &DmaConfig) {
        let dma2_stream0 = &self.dma2.st[0];
        dma2_stream0.cr.modify(|_, w| w.en().disabled());
        while dma2_stream0.cr.read().en().bit_is_set() {}
        self.dma2.lifcr.write(|w| unsafe { w.bits(STREAM0_FLAGS) });

        dma2_stream0.cr.modify(|_, w| unsafe {
            w.chsel()
                .bits(config.channel)
                .dbm()
                .disabled()
                // Wrap around at the end of the buffer
                .circ()
                .enabled()
                .msize()
                .bits16()
                .psize()
                .bits16()
                .minc()
                .incremented()
                .pinc()
                .fixed()
                .dir()
                .peripheral_to_memory()
                .pfctrl()
                .dma()
                .pl()
                .bits(config.priority.bits())
                .mburst()
                .single()
                .pburst()
                .single()
                .tcie()
                .disabled()
                .htie()
                .disabled()
                .teie()
                .disabled()
                .dmeie()
                .disabled()
                .ct()
                .memory0()
        });

        dma2_stream0.ndtr.write(|w| w.ndt().bits(config.len));
        dma2_stream0
            .par
            .write(|w| unsafe { w.pa().bits(config.peripheral_address) });
        dma2_stream0
            .m0ar
            .write(|w| unsafe { w.m0a().bits(config.memory as u32) });

        // FIFO on, drained at the configured fill level
        dma2_stream0.fcr.modify(|_, w| unsafe {
            w.dmdis()
                .set_bit()
                .fth()
                .bits(config.fifo_threshold.bits())
        });

        dma2_stream0.cr.modify(|_, w| w.en().enabled());
    }

    fn configure_adcs(&mut self, common: &AdcCommonConfig, adc: &AdcConfig) {
        self.adc_common.ccr.modify(|_, w| unsafe {
            w.multi()
                .bits(MULTI_DUAL_REGULAR)
                .dma()
                .bits(DMA_MODE_1)
                .delay()
                .bits(common.sampling_delay.bits())
                .adcpre()
                .bits(common.prescaler.bits())
        });

        let left = adc.alignment == Alignment::Left;
        let sequence_len = adc.conversions.saturating_sub(1);
        both_adcs!(self, |regs| {
            regs.cr2.modify(|_, w| w.adon().clear_bit());
            regs.cr1.modify(|_, w| unsafe {
                w.res()
                    .bits(adc.resolution.bits())
                    .scan()
                    .clear_bit()
                    .discen()
                    .clear_bit()
            });
            regs.cr2.modify(|_, w| unsafe {
                w.cont()
                    .clear_bit()
                    .align()
                    .bit(left)
                    .exten()
                    .bits(adc.trigger_edge.bits())
                    .extsel()
                    .bits(EXTSEL_TIM3_TRGO)
            });
            regs.sqr1.modify(|_, w| unsafe { w.l().bits(sequence_len) });
        });
    }

    fn bind_channel(&mut self, channel: u8, sample_time: SampleTime) {
        let field = SampleTimeField::for_channel(channel);
        both_adcs!(self, |regs| {
            regs.sqr3.modify(|_, w| unsafe { w.sq1().bits(channel) });
            match field {
                SampleTimeField::Smpr1(shift) => regs.smpr1.modify(|r, w| unsafe {
                    w.bits(SampleTimeField::apply(shift, r.bits(), sample_time))
                }),
                SampleTimeField::Smpr2(shift) => regs.smpr2.modify(|r, w| unsafe {
                    w.bits(SampleTimeField::apply(shift, r.bits(), sample_time))
                }),
            }
        });
    }

    fn enable_dma_requests(&mut self) {
        self.adc_common.ccr.modify(|_, w| w.dds().set_bit());
    }

    fn enable_adcs(&mut self) {
        both_adcs!(self, |regs| regs.cr2.modify(|_, w| w.adon().set_bit()));
    }

    fn start_conversion(&mut self) {
        self.adc1.cr2.modify(|_, w| w.swstart().set_bit());
    }

    fn disable_adcs(&mut self) {
        both_adcs!(self, |regs| regs.cr2.modify(|_, w| w.adon().clear_bit()));
    }

    fn disable_dma(&mut self) {
        self.dma2.st[0].cr.modify(|_, w| w.en().disabled());
    }

    fn disable_timer(&mut self) {
        self.tim3.cr1.modify(|_, w| w.cen().clear_bit());
    }

    fn dma_remaining(&self) -> u16 {
        self.dma2.st[0].ndtr.read().ndt().bits()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sample_time_fields() {
        assert_eq!(SampleTimeField::for_channel(0), SampleTimeField::Smpr2(0));
        assert_eq!(SampleTimeField::for_channel(3), SampleTimeField::Smpr2(9));
        assert_eq!(SampleTimeField::for_channel(9), SampleTimeField::Smpr2(27));
        assert_eq!(SampleTimeField::for_channel(10), SampleTimeField::Smpr1(0));
        assert_eq!(SampleTimeField::for_channel(13), SampleTimeField::Smpr1(9));
    }

    #[test]
    fn sample_time_only_touches_its_field() {
        let register = 0xFFFF_FFFF;
        let written = SampleTimeField::apply(9, register, SampleTime::Cycles15);
        assert_eq!(written, 0xFFFF_F3FF);

        let written = SampleTimeField::apply(0, 0, SampleTime::Cycles480);
        assert_eq!(written, 0b111);
    }

    #[test]
    fn analog_pin_modes() {
        // PA3 from reset, other pins untouched
        assert_eq!(analog_moder(0xA800_0000, 3), 0xA800_00C0);
        assert_eq!(floating_pupdr(0x6400_0040, 3), 0x6400_0000);
        assert_eq!(analog_moder(0, 15), 0xC000_0000);
    }
}
