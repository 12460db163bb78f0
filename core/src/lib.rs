#![cfg_attr(not(any(test, feature = "std")), no_std)]

// This must go first so that the other modules see its macros.
mod fmt;

mod error;
pub mod hal;
pub mod pin_map;
pub mod resources;
pub mod sample;
mod sampler;
pub mod settings;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod timer;

pub use error::Error;
pub use fugit::HertzU32;
pub use sampler::{Sampler, State};
pub use settings::Settings;
