//! Exclusive ownership of the shared peripherals a sampler programs.
//!
//! The timer, the DMA stream and both ADCs are chip-wide singletons. A
//! sampler claims all of them for as long as it is sampling, so a second
//! sampler fails to start instead of silently reprogramming the first one's
//! hardware.

use core::cell::Cell;
use core::fmt;

use critical_section::Mutex;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resource {
    Tim3,
    Dma2Stream0,
    Adc1,
    Adc2,
    /// The NVIC line of DMA2 stream 0, reserved but never serviced.
    Dma2Stream0Irq,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Tim3,
        Resource::Dma2Stream0,
        Resource::Adc1,
        Resource::Adc2,
        Resource::Dma2Stream0Irq,
    ];

    const fn mask(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Tim3 => "TIM3",
            Resource::Dma2Stream0 => "DMA2 stream 0",
            Resource::Adc1 => "ADC1",
            Resource::Adc2 => "ADC2",
            Resource::Dma2Stream0Irq => "DMA2 stream 0 interrupt",
        })
    }
}

pub struct ResourceLock {
    held: Mutex<Cell<u8>>,
}

impl ResourceLock {
    pub const fn new() -> Self {
        Self {
            held: Mutex::new(Cell::new(0)),
        }
    }

    /// Claim every resource in `resources`, or none of them.
    pub fn claim(&self, resources: &[Resource]) -> Result<Claim<'_>, Error> {
        let mask = resources.iter().fold(0, |mask, r| mask | r.mask());

        critical_section::with(|cs| {
            let held = self.held.borrow(cs);

            if let Some(&busy) = resources.iter().find(|r| held.get() & r.mask() != 0) {
                return Err(Error::ResourceBusy(busy));
            }

            held.set(held.get() | mask);
            Ok(Claim { lock: self, mask })
        })
    }

    pub fn is_held(&self, resource: Resource) -> bool {
        critical_section::with(|cs| self.held.borrow(cs).get() & resource.mask() != 0)
    }

    fn release(&self, mask: u8) {
        critical_section::with(|cs| {
            let held = self.held.borrow(cs);
            held.set(held.get() & !mask);
        });
    }
}

impl Default for ResourceLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Resources held in a [`ResourceLock`], given back on drop.
pub struct Claim<'a> {
    lock: &'a ResourceLock,
    mask: u8,
}

impl Claim<'_> {
    pub fn contains(&self, resource: Resource) -> bool {
        self.mask & resource.mask() != 0
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.lock.release(self.mask);
    }
}
