#![cfg_attr(not(test), no_std)]

pub mod dual_adc;
