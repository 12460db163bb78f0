//! Board pin table for the Nucleo-F767ZI.
//!
//! Pins are numbered like the Arduino header silkscreen: `D0..=D15` are
//! `0..=15`, `A0..=A5` are `16..=21`. A handful of morpho pins that reach
//! ADC1/ADC2 follow after that. `A3..=A5` are only wired to ADC3, so they
//! can't be used for dual sampling.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(pub u8);

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl Port {
    /// Offset of the port's enable bit in `RCC_AHB1ENR`.
    pub const fn index(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinInfo {
    pub port: Port,
    pub pin: u8,
    /// Regular channel shared by ADC1 and ADC2, if any.
    pub adc_channel: Option<u8>,
}

impl PinInfo {
    const fn new(port: Port, pin: u8, adc_channel: Option<u8>) -> Self {
        Self {
            port,
            pin,
            adc_channel,
        }
    }
}

pub const D0: PinId = PinId(0);
pub const D11: PinId = PinId(11);
pub const D12: PinId = PinId(12);
pub const D13: PinId = PinId(13);
pub const A0: PinId = PinId(16);
pub const A1: PinId = PinId(17);
pub const A2: PinId = PinId(18);
pub const A3: PinId = PinId(19);
pub const A4: PinId = PinId(20);
pub const A5: PinId = PinId(21);

use Port::*;

pub static PIN_MAP: [PinInfo; 26] = [
    // D0..=D15
    PinInfo::new(G, 9, None),
    PinInfo::new(G, 14, None),
    PinInfo::new(F, 15, None),
    PinInfo::new(E, 13, None),
    PinInfo::new(F, 14, None),
    PinInfo::new(E, 11, None),
    PinInfo::new(E, 9, None),
    PinInfo::new(F, 13, None),
    PinInfo::new(F, 12, None),
    PinInfo::new(D, 15, None),
    PinInfo::new(D, 14, None),
    PinInfo::new(A, 7, Some(7)),
    PinInfo::new(A, 6, Some(6)),
    PinInfo::new(A, 5, Some(5)),
    PinInfo::new(B, 9, None),
    PinInfo::new(B, 8, None),
    // A0..=A5
    PinInfo::new(A, 3, Some(3)),
    PinInfo::new(C, 0, Some(10)),
    PinInfo::new(C, 3, Some(13)),
    PinInfo::new(F, 3, None),
    PinInfo::new(F, 5, None),
    PinInfo::new(F, 10, None),
    // Morpho
    PinInfo::new(A, 0, Some(0)),
    PinInfo::new(A, 4, Some(4)),
    PinInfo::new(B, 1, Some(9)),
    PinInfo::new(C, 2, Some(12)),
];

pub fn pin_info(pin: PinId) -> Option<PinInfo> {
    PIN_MAP.get(usize::from(pin.0)).copied()
}

/// Like [`pin_info`], but only for pins that ADC1 and ADC2 can both sample.
pub fn adc_pin_info(pin: PinId) -> Option<PinInfo> {
    pin_info(pin).filter(|info| info.adc_channel.is_some())
}
