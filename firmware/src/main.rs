#![no_main]
#![no_std]
#![feature(type_alias_impl_trait)]

use defmt::{unwrap, Debug2Format};
use defmt_rtt as _;
use panic_probe as _;
use rtic::{app, Mutex};
use rtic_monotonics::systick::{ExtU64, Systick};
use static_cell::StaticCell;
use stm32f7xx_hal::{
    gpio::{Output, Pin},
    prelude::*,
};

use dual_adc_sampler::{
    hal::Resolution,
    pin_map,
    resources::ResourceLock,
    sample::{self, DualSample},
    HertzU32, Sampler, Settings,
};
use dual_adc_sampler_firmware::dual_adc::{Buses, Stm32DualAdc};

const CAPTURE_LEN: usize = 1024;
const SAMPLE_RATES: [HertzU32; 2] = [HertzU32::kHz(8), HertzU32::kHz(16)];
/// Reports between switching sample rates
const REPORTS_PER_RATE: u32 = 10;
const VREF_MV: u32 = 3300;

static RESOURCES: ResourceLock = ResourceLock::new();

#[app(device = stm32f7xx_hal::pac, dispatchers = [CAN1_RX0])]
mod app {
    use super::*;

    static CAPTURE: StaticCell<[u16; CAPTURE_LEN]> = StaticCell::new();

    #[shared]
    struct Shared {
        sampler: Sampler<'static, Stm32DualAdc>,
    }

    #[local]
    struct Local {}

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        let p = cx.device;

        let mut rcc = p.RCC.constrain();
        let clocks = rcc.cfgr.sysclk(216.MHz()).hclk(216.MHz()).freeze();
        defmt::println!("Clocks: {:?}", Debug2Format(&clocks));

        // Setup systick to be used for delays
        let systick_token = rtic_monotonics::create_systick_token!();
        Systick::start(cx.core.SYST, clocks.sysclk().to_Hz(), systick_token);

        let gpiob = p.GPIOB.split();
        let led_pin = gpiob.pb7.into_push_pull_output();

        let adc = Stm32DualAdc::new(
            p.ADC1,
            p.ADC2,
            p.ADC_COMMON,
            p.TIM3,
            p.DMA2,
            cx.core.NVIC,
            Buses {
                ahb1: rcc.ahb1,
                apb1: rcc.apb1,
                apb2: rcc.apb2,
            },
        );

        // TIM3 hangs off APB1
        let settings = Settings::new().with_timer_clock(clocks.timclk1());
        let buffer = CAPTURE.init_with(|| [0; CAPTURE_LEN]);
        let mut sampler = unwrap!(Sampler::new(
            adc,
            &RESOURCES,
            pin_map::A0,
            buffer,
            settings
        ));
        unwrap!(sampler.start(SAMPLE_RATES[0]));

        blinky::spawn(led_pin).unwrap_or_else(|_| defmt::panic!("Failed to start blinky"));
        report::spawn().unwrap_or_else(|_| defmt::panic!("Failed to start report"));

        (Shared { sampler }, Local {})
    }

    /// Logs the latest conversions once a second and switches between the
    /// sample rates every few reports.
    #[task(shared = [sampler], priority = 1)]
    async fn report(mut cx: report::Context) {
        let mut latest = [DualSample { adc1: 0, adc2: 0 }; 4];
        let mut rate = 0;
        let mut reports = 0u32;

        loop {
            Systick::delay(1000u64.millis()).await;

            let (position, count) = cx.shared.sampler.lock(|sampler| {
                (
                    sampler.write_position(),
                    sampler.copy_latest_pairs(&mut latest),
                )
            });
            let Some(position) = position else {
                continue;
            };
            log_pairs(position, &latest[..count]);

            reports += 1;
            if reports % REPORTS_PER_RATE == 0 {
                rate = (rate + 1) % SAMPLE_RATES.len();
                let frequency = SAMPLE_RATES[rate];
                cx.shared.sampler.lock(|sampler| {
                    sampler.stop();
                    match sampler.start(frequency) {
                        Ok(()) => defmt::info!("Now sampling at {}", frequency),
                        Err(e) => defmt::error!("Failed to restart sampling: {}", e),
                    }
                });
            }
        }
    }

    fn log_pairs(position: usize, pairs: &[DualSample]) {
        for pair in pairs {
            let (raw1, raw2) = pair.raw(Resolution::Bits12);
            defmt::info!(
                "@{=usize} adc1={=u16} adc2={=u16} avg={=u32}mV",
                position,
                raw1,
                raw2,
                sample::to_millivolts(pair.average(Resolution::Bits12), Resolution::Bits12, VREF_MV)
            );
        }
    }

    /// Blinks the blue LED on the Nucleo board to indicate that the program is
    /// running
    #[task(priority = 0)]
    async fn blinky(_cx: blinky::Context, mut led: Pin<'B', 7, Output>) {
        loop {
            Systick::delay(500u64.millis()).await;
            led.set_high();
            Systick::delay(500u64.millis()).await;
            led.set_low();
        }
    }
}
